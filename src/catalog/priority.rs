//! Priority-ordered insertion for per-device config lists.

use crate::config::Config;

/// Anything that can be placed in a priority-ordered config list.
pub trait Ranked {
    fn rank_name(&self) -> &str;
    fn rank_priority(&self) -> i32;
}

impl Ranked for Config {
    fn rank_name(&self) -> &str {
        &self.name
    }

    fn rank_priority(&self) -> i32 {
        self.priority
    }
}

impl<T: Ranked + ?Sized> Ranked for &T {
    fn rank_name(&self) -> &str {
        (**self).rank_name()
    }

    fn rank_priority(&self) -> i32 {
        (**self).rank_priority()
    }
}

/// Insert `item` keeping `list` in descending priority order.
///
/// Equal priorities keep arrival order. An entry with the same name already in
/// the list wins and `item` is dropped; returns whether `item` was inserted.
pub fn insert_sorted<T: Ranked>(list: &mut Vec<T>, item: T) -> bool {
    if list
        .iter()
        .any(|existing| existing.rank_name() == item.rank_name())
    {
        return false;
    }

    let position = list
        .iter()
        .position(|existing| item.rank_priority() > existing.rank_priority())
        .unwrap_or(list.len());
    list.insert(position, item);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BusType;

    fn names(list: &[&Config]) -> Vec<String> {
        list.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn stable_descending_order() {
        let configs = [
            Config::new("five", BusType::Pci).with_priority(5),
            Config::new("ten-a", BusType::Pci).with_priority(10),
            Config::new("three", BusType::Pci).with_priority(3),
            Config::new("ten-b", BusType::Pci).with_priority(10),
        ];
        let mut list = Vec::new();
        for config in &configs {
            assert!(insert_sorted(&mut list, config));
        }
        assert_eq!(names(&list), vec!["ten-a", "ten-b", "five", "three"]);
    }

    #[test]
    fn duplicate_name_is_noop_regardless_of_priority() {
        let low = Config::new("video-vesa", BusType::Pci).with_priority(0);
        let high = Config::new("video-vesa", BusType::Pci).with_priority(99);
        let other = Config::new("video-linux", BusType::Pci).with_priority(5);
        let mut list = vec![&other, &low];

        assert!(!insert_sorted(&mut list, &high));
        assert_eq!(names(&list), vec!["video-linux", "video-vesa"]);
        assert_eq!(list[1].priority, 0);
    }

    #[test]
    fn negative_priorities_sort_after_zero() {
        let a = Config::new("fallback", BusType::Usb).with_priority(-1);
        let b = Config::new("default", BusType::Usb);
        let mut list = Vec::new();
        insert_sorted(&mut list, &a);
        insert_sorted(&mut list, &b);
        assert_eq!(names(&list), vec!["default", "fallback"]);
    }
}
