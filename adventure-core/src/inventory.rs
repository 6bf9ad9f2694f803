//! # Inventory 模块
//!
//! 物品选中与"对交互物使用物品"。物品栏本身存放在 `PlayState` 中，这里只管选中状态。

use tracing::debug;

use crate::interaction::find_interactable;
use crate::notification::Notification;
use crate::services::Services;

/// 物品选中状态
#[derive(Debug, Default)]
pub struct ItemSelection {
    selected: Option<String>,
}

impl ItemSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// 选中物品；None 表示取消选中
    ///
    /// 只能选中物品栏中已有的物品。
    pub fn select(&mut self, item_id: Option<&str>, sv: &mut Services) {
        if !sv.is_input_allowed() {
            return;
        }
        match item_id {
            None => self.deselect(sv),
            Some(id) if sv.save.has_item(id) => {
                self.selected = Some(id.to_string());
                sv.emit(Notification::ItemSelected {
                    item_id: id.to_string(),
                });
            }
            Some(id) => debug!(item_id = id, "物品不在物品栏中，无法选中"),
        }
    }

    fn deselect(&mut self, sv: &mut Services) {
        if self.selected.take().is_some() {
            sv.emit(Notification::ItemDeselected);
        }
    }

    /// 对交互物使用当前选中的物品，返回被使用的物品
    ///
    /// 没有选中、交互物不存在、或交互物声明了可用物品而选中的不在其中时拒绝。
    /// 消耗品使用后取消选中。
    pub fn use_selected(&mut self, interactable_id: &str, sv: &mut Services) -> Option<String> {
        if !sv.is_input_allowed() {
            return None;
        }
        let item_id = self.selected.clone()?;
        if !sv.save.has_item(&item_id) {
            self.deselect(sv);
            return None;
        }

        let Some(interactable) = find_interactable(sv, interactable_id) else {
            debug!(interactable_id, "交互物不存在，无法使用物品");
            return None;
        };
        if !interactable.compatible_items.is_empty()
            && !interactable.compatible_items.contains(&item_id)
        {
            debug!(interactable_id, item_id = %item_id, "物品与交互物不匹配");
            return None;
        }

        sv.save.mark_item_used(&item_id, &mut sv.outbox);
        sv.emit(Notification::ItemUsedOn {
            item_id: item_id.clone(),
            interactable_id: interactable_id.to_string(),
        });

        if sv.catalog.item(&item_id).is_some_and(|i| i.consumable) {
            self.deselect(sv);
        }
        Some(item_id)
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::GameMode;
    use crate::test_support::services_with;

    const CATALOG: &str = r#"{
        "new_game": { "start_scene": "bedroom" },
        "items": [ { "id": "key", "consumable": true }, { "id": "coin" } ],
        "scenes": [ {
            "id": "bedroom",
            "interactables": [
                { "id": "drawer", "type": "animation", "animation": "open", "compatible_items": ["key"] },
                { "id": "jar", "type": "animation", "animation": "clink" }
            ]
        } ]
    }"#;

    fn setup() -> (Services, ItemSelection) {
        let mut sv = services_with(CATALOG);
        sv.save.start_new_game("bedroom");
        sv.set_mode(GameMode::Gameplay);
        sv.save.add_item("key", &mut sv.outbox);
        sv.save.add_item("coin", &mut sv.outbox);
        (sv, ItemSelection::new())
    }

    #[test]
    fn test_only_owned_items_selectable() {
        let (mut sv, mut selection) = setup();
        selection.select(Some("map"), &mut sv);
        assert_eq!(selection.selected(), None);

        selection.select(Some("coin"), &mut sv);
        assert_eq!(selection.selected(), Some("coin"));

        selection.select(None, &mut sv);
        assert_eq!(selection.selected(), None);
        assert!(sv.outbox.iter().any(|n| matches!(n, Notification::ItemDeselected)));
    }

    #[test]
    fn test_incompatible_item_rejected() {
        let (mut sv, mut selection) = setup();
        selection.select(Some("coin"), &mut sv);
        assert_eq!(selection.use_selected("drawer", &mut sv), None);
        assert!(!sv.save.is_item_used("coin"));

        // 没有声明可用物品的交互物接受任何物品
        assert_eq!(selection.use_selected("jar", &mut sv), Some("coin".to_string()));
        assert!(sv.save.is_item_used("coin"));
        assert_eq!(selection.selected(), Some("coin"));
    }

    #[test]
    fn test_consumable_clears_selection() {
        let (mut sv, mut selection) = setup();
        selection.select(Some("key"), &mut sv);
        assert_eq!(selection.use_selected("drawer", &mut sv), Some("key".to_string()));
        assert_eq!(selection.selected(), None);
        assert!(sv.outbox.iter().any(|n| matches!(
            n,
            Notification::ItemUsedOn { item_id, interactable_id }
                if item_id == "key" && interactable_id == "drawer"
        )));
    }

    #[test]
    fn test_nothing_selected() {
        let (mut sv, mut selection) = setup();
        assert_eq!(selection.use_selected("jar", &mut sv), None);
    }
}
