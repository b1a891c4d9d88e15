// src/storage/paths.rs

//! Store path layout shared by every backend.

use crate::models::Category;

/// Path of the progress checkpoint. Unlike the other snapshot documents it
/// lives at the store root, not under the image root.
pub const CHECKPOINT_KEY: &str = "progress.json";

/// Path of the persisted hash registry.
pub fn registry_key(root_dir: &str) -> String {
    format!("{root_dir}/hash_registry.json")
}

/// Path of the persisted category counters.
pub fn counters_key(root_dir: &str) -> String {
    format!("{root_dir}/count.json")
}

/// Root-relative path of an image: `{category}/{sequence}.webp`. This is
/// the form the hash registry stores.
pub fn relative_asset_key(category: Category, sequence: u64) -> String {
    format!("{}/{sequence}.webp", category.code())
}

/// Store path of an image: `{root}/{category}/{sequence}.webp`.
pub fn asset_key(root_dir: &str, category: Category, sequence: u64) -> String {
    format!("{root_dir}/{}", relative_asset_key(category, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Brightness, Category, Orientation};

    #[test]
    fn snapshot_keys_live_under_the_root() {
        assert_eq!(registry_key("ri"), "ri/hash_registry.json");
        assert_eq!(counters_key("ri"), "ri/count.json");
        assert_eq!(CHECKPOINT_KEY, "progress.json");
    }

    #[test]
    fn asset_keys_use_category_code_and_sequence() {
        let tall_light = Category::new(Orientation::Tall, Brightness::Light);
        assert_eq!(asset_key("ri", tall_light, 7), "ri/vl/7.webp");
        assert_eq!(relative_asset_key(tall_light, 7), "vl/7.webp");
    }
}
