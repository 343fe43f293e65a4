use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::KeyValueStore;
use crate::capture::StoredCapture;

pub const LAST_CAPTURE_KEY: &str = "snapfit:lastCapture";
pub const FLASH_SETTING_KEY: &str = "snapfit:settings:flash";
pub const CAMERA_PERMISSION_KEY: &str = "snapfit:permissions:camera";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashSetting {
    On,
    Off,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPermission {
    Granted,
    Denied,
}

/// Typed records over a [`KeyValueStore`].
///
/// Nothing here fails: unreadable or malformed records read back as absent,
/// and failed writes are logged and dropped.
#[derive(Debug)]
pub struct CaptureStore<S> {
    store: S,
}

impl<S: KeyValueStore> CaptureStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn last_capture<R: DeserializeOwned>(&self) -> Option<StoredCapture<R>> {
        self.read(LAST_CAPTURE_KEY)
    }

    pub fn save_last_capture<R: Serialize>(&self, capture: &StoredCapture<R>) {
        self.write(LAST_CAPTURE_KEY, capture);
    }

    pub fn clear_last_capture(&self) {
        if let Err(err) = self.store.remove(LAST_CAPTURE_KEY) {
            log::warn!("storage remove failed for {LAST_CAPTURE_KEY:?}: {err:#}");
        }
    }

    pub fn flash_setting(&self) -> FlashSetting {
        self.read(FLASH_SETTING_KEY).unwrap_or_default()
    }

    pub fn set_flash_setting(&self, setting: FlashSetting) {
        self.write(FLASH_SETTING_KEY, &setting);
    }

    pub fn camera_permission(&self) -> Option<CameraPermission> {
        self.read(CAMERA_PERMISSION_KEY)
    }

    pub fn set_camera_permission(&self, permission: CameraPermission) {
        self.write(CAMERA_PERMISSION_KEY, &permission);
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.store.get(key) {
            Ok(Some(Value::Null)) | Ok(None) => return None,
            Ok(Some(value)) => value,
            Err(err) => {
                log::warn!("storage read failed for {key:?}: {err:#}");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                log::warn!("storage record {key:?} is malformed: {err}");
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let result = serde_json::to_value(value)
            .map_err(anyhow::Error::from)
            .and_then(|value| self.store.set(key, value));
        if let Err(err) = result {
            log::warn!("storage write failed for {key:?}: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::result::{
        Confidence, IdentificationResult, Level, MergedIdentification, Source, SourceError, Tag,
    };
    use crate::storage::{JsonFileStore, MemoryStore};

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<Value>> {
            anyhow::bail!("disk unavailable")
        }

        fn set(&self, _key: &str, _value: Value) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            anyhow::bail!("disk unavailable")
        }
    }

    fn unified_result(product_name: Option<&str>, material: Option<&str>) -> IdentificationResult {
        IdentificationResult {
            identified: true,
            category: "Outerwear".to_string(),
            subcategory: "Denim Jacket".to_string(),
            color: "Indigo".to_string(),
            pattern: "Solid".to_string(),
            material: material.map(str::to_string),
            style: "Casual".to_string(),
            brand: "Levi's".to_string(),
            product_name: product_name.map(str::to_string),
            confidence: Confidence {
                brand: Level::Medium,
                material: Level::High,
            },
            reasoning: "Red tab on the chest pocket.".to_string(),
            timestamp: 1_700_000_000_123,
        }
    }

    #[test]
    fn unified_capture_round_trips_through_file_store() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = CaptureStore::new(JsonFileStore::new(temp.path().join("store.json")));
        for (product_name, material) in [
            (Some("Trucker Jacket"), Some("Denim")),
            (None, Some("Denim")),
            (Some("Trucker Jacket"), None),
            (None, None),
        ] {
            let capture = StoredCapture {
                image_uri: "file:///cache/processed_capture.jpg".to_string(),
                timestamp: 1_700_000_000_123,
                result: Some(unified_result(product_name, material)),
            };
            store.save_last_capture(&capture);
            assert_eq!(store.last_capture::<IdentificationResult>(), Some(capture));
        }
        Ok(())
    }

    #[test]
    fn merged_capture_round_trips_with_nulls() {
        let store = CaptureStore::new(MemoryStore::new());
        let capture = StoredCapture {
            image_uri: "file:///cache/processed_capture.jpg".to_string(),
            timestamp: 5,
            result: Some(MergedIdentification {
                color: Some("Blue".to_string()),
                tags: vec![Tag {
                    name: "Color/Blue".to_string(),
                    confidence: 0.75,
                }],
                brand_confidence: Some(Level::Low),
                timestamp: 5,
                errors: vec![SourceError {
                    source: Source::BrandInference,
                    message: "OpenAI request failed (500)".to_string(),
                }],
                ..MergedIdentification::default()
            }),
        };
        store.save_last_capture(&capture);
        assert_eq!(store.last_capture::<MergedIdentification>(), Some(capture));
    }

    #[test]
    fn capture_without_result_round_trips() {
        let store = CaptureStore::new(MemoryStore::new());
        let capture: StoredCapture<IdentificationResult> = StoredCapture {
            image_uri: "file:///cache/processed_capture.jpg".to_string(),
            timestamp: 9,
            result: None,
        };
        store.save_last_capture(&capture);
        assert_eq!(store.last_capture(), Some(capture));

        store.clear_last_capture();
        assert_eq!(store.last_capture::<IdentificationResult>(), None);
    }

    #[test]
    fn malformed_record_reads_as_absent() -> anyhow::Result<()> {
        let store = CaptureStore::new(MemoryStore::new());
        store
            .inner()
            .set(LAST_CAPTURE_KEY, json!({"imageUri": 3}))?;
        assert_eq!(store.last_capture::<IdentificationResult>(), None);

        store.inner().set(FLASH_SETTING_KEY, json!("strobe"))?;
        assert_eq!(store.flash_setting(), FlashSetting::Auto);
        Ok(())
    }

    #[test]
    fn failing_store_is_absorbed() {
        let store = CaptureStore::new(BrokenStore);
        store.set_flash_setting(FlashSetting::On);
        store.save_last_capture(&StoredCapture::<IdentificationResult> {
            image_uri: "file:///x.jpg".to_string(),
            timestamp: 1,
            result: None,
        });
        store.clear_last_capture();
        assert_eq!(store.flash_setting(), FlashSetting::Auto);
        assert_eq!(store.camera_permission(), None);
        assert_eq!(store.last_capture::<IdentificationResult>(), None);
    }

    #[test]
    fn settings_round_trip() {
        let store = CaptureStore::new(MemoryStore::new());
        assert_eq!(store.flash_setting(), FlashSetting::Auto);
        store.set_flash_setting(FlashSetting::Off);
        assert_eq!(store.flash_setting(), FlashSetting::Off);

        assert_eq!(store.camera_permission(), None);
        store.set_camera_permission(CameraPermission::Granted);
        assert_eq!(store.camera_permission(), Some(CameraPermission::Granted));
    }

    #[test]
    fn settings_survive_a_truncated_store_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("store.json");
        std::fs::write(&path, "{\"snapfit:lastCap")?;
        let store = CaptureStore::new(JsonFileStore::new(&path));

        assert_eq!(store.flash_setting(), FlashSetting::Auto);
        store.set_flash_setting(FlashSetting::On);
        assert_eq!(store.flash_setting(), FlashSetting::On);
        Ok(())
    }
}
