//! Read-side presentation: captions and featured values
//!
//! Pure consumers of a resolved schema plus instance values. These never
//! fail; an entity with nothing to show yields an empty result.

use crate::entity::Entity;
use crate::model::{Property, Schema};

impl Schema {
    /// Caption candidates in scan order: caption-flagged properties
    /// first (lexicographic), then the merged caption priority list.
    pub fn caption_order(&self) -> Vec<&str> {
        let mut order: Vec<&str> = self
            .properties
            .iter()
            .filter(|(_, property)| property.caption)
            .map(|(name, _)| name.as_str())
            .collect();
        for name in &self.caption {
            if !order.contains(&name.as_str()) {
                order.push(name);
            }
        }
        order
    }

    /// First non-empty caption value of the entity.
    pub fn caption<'e>(&self, entity: &'e Entity) -> Option<&'e str> {
        self.caption_order()
            .into_iter()
            .find_map(|name| entity.first(name))
    }

    /// Values for the merged featured list, in declared order,
    /// properties without a value omitted.
    pub fn featured_values<'e>(&self, entity: &'e Entity) -> Vec<(&Property, Vec<&'e str>)> {
        let mut result = Vec::new();
        for name in &self.featured {
            let Some(property) = self.properties.get(name) else {
                continue;
            };
            let values: Vec<&str> = entity
                .values(name)
                .iter()
                .map(String::as_str)
                .filter(|value| !value.trim().is_empty())
                .collect();
            if !values.is_empty() {
                result.push((property, values));
            }
        }
        result
    }

    /// Merged properties in display order: caption candidates first,
    /// then featured, then by label.
    pub fn sorted_properties(&self) -> Vec<&Property> {
        let mut properties: Vec<&Property> = self.properties.values().collect();
        properties.sort_by_key(|property| {
            (
                !property.caption && !self.caption.contains(&property.name),
                !self.featured.contains(&property.name),
                property.label.clone(),
            )
        });
        properties
    }
}

#[cfg(test)]
mod tests {
    use crate::entity::Entity;
    use crate::loader;
    use crate::model::Model;

    fn model() -> Model {
        Model::from_descriptors(
            loader::from_str(
                r#"
Document:
  featured: [title, fileName]
  caption: [title, fileName]
  properties:
    title: {}
    fileName: {}
    mimeType: {}
Email:
  extends: Document
  featured: [subject, sender]
  caption: [subject, threadTopic, title, fileName]
  properties:
    subject: {}
    threadTopic: {}
    sender: {}
"#,
                "test.yaml",
            )
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_caption_takes_first_non_empty() {
        let model = model();
        let email = model.get("Email").unwrap();

        let mut message = Entity::new("msg-1", "Email");
        message.add("subject", "");
        message.add("threadTopic", "Quarterly numbers");
        message.add("title", "archived.eml");
        assert_eq!(email.caption(&message), Some("Quarterly numbers"));
    }

    #[test]
    fn test_caption_of_empty_entity_is_none() {
        let model = model();
        let email = model.get("Email").unwrap();
        let message = Entity::new("msg-2", "Email");
        assert_eq!(email.caption(&message), None);
    }

    #[test]
    fn test_caption_flag_is_prepended() {
        let model = Model::from_descriptors(
            loader::from_str(
                r#"
Note:
  caption: [title]
  properties:
    title: {}
    headline:
      caption: true
"#,
                "test.yaml",
            )
            .unwrap(),
        )
        .unwrap();
        let note = model.get("Note").unwrap();
        assert_eq!(note.caption_order(), vec!["headline", "title"]);

        let mut entity = Entity::new("note-1", "Note");
        entity.add("title", "fallback");
        entity.add("headline", "lead story");
        assert_eq!(note.caption(&entity), Some("lead story"));
    }

    #[test]
    fn test_featured_preserves_order_and_omits_empty() {
        let model = model();
        let email = model.get("Email").unwrap();

        let mut message = Entity::new("msg-3", "Email");
        message.add("sender", "alice@example.com");
        message.add("title", "saved.eml");
        message.add("subject", "   ");

        let featured = email.featured_values(&message);
        let names: Vec<&str> = featured
            .iter()
            .map(|(property, _)| property.name.as_str())
            .collect();
        // merged order: own list first, inherited appended
        assert_eq!(names, vec!["sender", "title"]);
    }

    #[test]
    fn test_sorted_properties_order() {
        let model = model();
        let email = model.get("Email").unwrap();
        let sorted = email.sorted_properties();
        // caption candidates lead, non-featured stragglers trail
        assert_eq!(sorted.first().map(|p| p.name.as_str()), Some("fileName"));
        assert_eq!(sorted.last().map(|p| p.name.as_str()), Some("mimeType"));
    }
}
