use serde::{Deserialize, Serialize};

///
/// 효과로 올리고 내릴 수 있는 수치. 기본값에 누적 보정치를 더해 현재값을 계산합니다.
///
pub trait Resource {
    fn base(&self) -> i32;

    /// 지금까지 더해진 보정치의 합
    fn modifier(&self) -> i32;

    fn set_modifier(&mut self, modifier: i32);

    /// 현재값의 하한
    fn floor(&self) -> Option<i32> {
        None
    }

    fn value(&self) -> i32 {
        let raw = self.base().saturating_add(self.modifier());
        match self.floor() {
            Some(floor) => raw.max(floor),
            None => raw,
        }
    }

    fn apply(&mut self, amount: i32) {
        self.set_modifier(self.modifier().saturating_add(amount));
    }
}

pub trait ResourceExtension: Resource {
    /// 보정치를 모두 지웁니다
    fn clear(&mut self) {
        self.set_modifier(0);
    }

    fn is_modified(&self) -> bool {
        self.modifier() != 0
    }
}

/// 공격력/수비력. 보정치가 음수여도 현재값은 0 아래로 내려가지 않습니다.
///
/// 보정치를 따로 들고 있으므로 -1500 뒤에 +1000 을 받으면 기본값 1000 의 카드는 500 이 됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatResource {
    base: i32,
    modifier: i32,
}

impl Resource for StatResource {
    fn base(&self) -> i32 {
        self.base
    }

    fn modifier(&self) -> i32 {
        self.modifier
    }

    fn set_modifier(&mut self, modifier: i32) {
        self.modifier = modifier;
    }

    fn floor(&self) -> Option<i32> {
        Some(0)
    }
}

impl ResourceExtension for StatResource {}

impl StatResource {
    pub fn new(base: i32) -> Self {
        Self {
            base: base.max(0),
            modifier: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_is_floored_but_modifier_is_kept() {
        let mut stat = StatResource::new(1000);
        stat.apply(-1500);
        assert_eq!(stat.value(), 0);
        stat.apply(1000);
        assert_eq!(stat.value(), 500);
        assert!(stat.is_modified());

        stat.clear();
        assert_eq!(stat.value(), 1000);
        assert!(!stat.is_modified());
    }
}
