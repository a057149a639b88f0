//! Core entity structures

use crate::ItemId;
use serde::{Deserialize, Serialize};

/// Item - the keyed entity served through the cache-aside layer.
///
/// `id` is `None` until the entity store assigns one on first save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Item {
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub id: Option<ItemId>,
    pub name: String,
    pub description: String,
}

impl Item {
    /// Create an item that has not been persisted yet.
    pub fn unsaved(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Create an item with a known identifier.
    pub fn with_id(id: ItemId, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            description: description.into(),
        }
    }

    /// Whether the store has assigned an identifier yet.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Drop the identifier, keeping the mutable fields.
    pub fn into_draft(self) -> ItemDraft {
        ItemDraft {
            name: self.name,
            description: self.description,
        }
    }
}

/// Client-supplied item fields for create and update.
///
/// Carries no identifier: ids are assigned by the store on create and taken
/// from the path on update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ItemDraft {
    pub name: String,
    pub description: String,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// Item ready for a first save (no identifier).
    pub fn into_unsaved(self) -> Item {
        Item {
            id: None,
            name: self.name,
            description: self.description,
        }
    }

    /// Item bound to `id`, overriding anything the caller may have meant.
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id: Some(id),
            name: self.name,
            description: self.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_into_item_binds_id() {
        let item = ItemDraft::new("B", "second").into_item(ItemId::new(1));
        assert_eq!(item.id, Some(ItemId::new(1)));
        assert_eq!(item.name, "B");
        assert!(item.is_persisted());
    }

    #[test]
    fn test_into_draft_drops_id() {
        let draft = Item::with_id(ItemId::new(9), "A", "first").into_draft();
        assert_eq!(draft, ItemDraft::new("A", "first"));
        assert!(!draft.into_unsaved().is_persisted());
    }

    #[test]
    fn test_item_json_shape() {
        let item = Item::with_id(ItemId::new(1), "A", "desc");
        let value = serde_json::to_value(&item).expect("serialize should succeed");
        assert_eq!(value["id"], 1);
        assert_eq!(value["name"], "A");
        assert_eq!(value["description"], "desc");

        let unsaved = serde_json::to_value(Item::unsaved("A", "desc"))
            .expect("serialize should succeed");
        assert!(unsaved["id"].is_null());
    }
}
