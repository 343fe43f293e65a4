use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{describe, index_path, join_path, FromJson, ObjectReader, SchemaError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionTag {
    pub name: String,
    pub prob: f64,
}

/// Tag-group name to tags, in the order the service returned them.
pub type TagGroups = IndexMap<String, Vec<VisionTag>>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisionTagRecord {
    pub tags: TagGroups,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisionTagResponse {
    pub records: Vec<VisionTagRecord>,
}

impl FromJson for VisionTag {
    fn from_json_at(value: &Value, path: &str) -> Result<Self, SchemaError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            name: reader.string("name")?,
            prob: reader.probability("prob")?,
        })
    }
}

impl FromJson for VisionTagRecord {
    fn from_json_at(value: &Value, path: &str) -> Result<Self, SchemaError> {
        let reader = ObjectReader::new(value, path)?;
        let groups_value = reader.field("_tags")?;
        let groups_path = join_path(path, "_tags");
        let Some(groups) = groups_value.as_object() else {
            return Err(SchemaError::new(
                &groups_path,
                "object",
                describe(groups_value),
            ));
        };

        let mut tags = TagGroups::new();
        for (group, rows) in groups {
            let group_path = join_path(&groups_path, group);
            let Some(rows) = rows.as_array() else {
                return Err(SchemaError::new(&group_path, "array", describe(rows)));
            };
            let parsed = rows
                .iter()
                .enumerate()
                .map(|(idx, row)| VisionTag::from_json_at(row, &index_path(&group_path, idx)))
                .collect::<Result<Vec<VisionTag>, SchemaError>>()?;
            tags.insert(group.clone(), parsed);
        }
        Ok(Self { tags })
    }
}

impl FromJson for VisionTagResponse {
    fn from_json_at(value: &Value, path: &str) -> Result<Self, SchemaError> {
        let reader = ObjectReader::new(value, path)?;
        let Some(rows) = reader.optional_array("records")? else {
            return Ok(Self::default());
        };
        let records_path = join_path(path, "records");
        let records = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| VisionTagRecord::from_json_at(row, &index_path(&records_path, idx)))
            .collect::<Result<Vec<VisionTagRecord>, SchemaError>>()?;
        Ok(Self { records })
    }
}
