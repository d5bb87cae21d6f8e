use std::{
    collections::{HashMap, HashSet},
    error::Error,
    fmt,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{data::config::SiteConfig, systems::navigation::ActionType};

use super::template;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuStructure {
    pub menu_items: Vec<MenuEntry>,
    #[serde(default)]
    pub icons: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub sub_items: Vec<SubEntry>,
    /// Names a feed filled in at runtime; the column starts empty.
    #[serde(default)]
    pub dynamic_content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubEntry {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub action: ActionType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuSchemaError {
    Parse(String),
    Io(String),
    NoItems,
    EmptyId { index: usize },
    EmptyTitle { id: String },
    DuplicateId { id: String },
}

impl fmt::Display for MenuSchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "menu structure parse error: {err}"),
            Self::Io(err) => write!(f, "menu structure could not be read: {err}"),
            Self::NoItems => write!(f, "menu structure must define at least one item"),
            Self::EmptyId { index } => write!(f, "menu item #{index} has an empty id"),
            Self::EmptyTitle { id } => write!(f, "menu item `{id}` has an empty title"),
            Self::DuplicateId { id } => write!(f, "duplicate menu item id `{id}`"),
        }
    }
}

impl Error for MenuSchemaError {}

impl MenuStructure {
    /// Every problem with the structure, in item order.
    pub fn validate(&self) -> Vec<MenuSchemaError> {
        let mut errors = Vec::new();
        if self.menu_items.is_empty() {
            errors.push(MenuSchemaError::NoItems);
        }

        let mut seen_ids = HashSet::new();
        for (index, item) in self.menu_items.iter().enumerate() {
            if item.id.trim().is_empty() {
                errors.push(MenuSchemaError::EmptyId { index });
            } else if !seen_ids.insert(item.id.as_str()) {
                errors.push(MenuSchemaError::DuplicateId {
                    id: item.id.clone(),
                });
            }
            if item.title.trim().is_empty() {
                errors.push(MenuSchemaError::EmptyTitle {
                    id: item.id.clone(),
                });
            }
        }
        errors
    }

    /// Used when neither the configured file nor the compiled-in structure
    /// can be read.
    pub fn fallback() -> Self {
        let placeholder = |name: &str| SubEntry {
            name: name.to_string(),
            url: String::from("#"),
            icon: String::from("info"),
            action: ActionType::None,
        };
        Self {
            menu_items: vec![
                MenuEntry {
                    id: String::from("contact"),
                    title: String::from("Contact"),
                    icon: String::from("chat"),
                    sub_items: vec![SubEntry {
                        name: String::from("GitHub"),
                        url: String::from("https://github.com"),
                        icon: String::from("github"),
                        action: ActionType::ExternalLink,
                    }],
                    dynamic_content: None,
                },
                MenuEntry {
                    id: String::from("projects"),
                    title: String::from("Projects"),
                    icon: String::from("folder"),
                    sub_items: vec![placeholder("Loading...")],
                    dynamic_content: None,
                },
            ],
            icons: HashMap::new(),
        }
    }
}

/// Parses, substitutes `{key.path}` tokens, then validates.
pub fn parse_menu_structure(
    json: &str,
    site: &SiteConfig,
) -> Result<MenuStructure, MenuSchemaError> {
    let raw: Value =
        serde_json::from_str(json).map_err(|err| MenuSchemaError::Parse(err.to_string()))?;
    let substituted = template::substitute_value(raw, &site.template_values());
    let structure: MenuStructure = serde_json::from_value(substituted)
        .map_err(|err| MenuSchemaError::Parse(err.to_string()))?;

    match structure.validate().into_iter().next() {
        Some(error) => Err(error),
        None => Ok(structure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "menuItems": [
            {
                "id": "contact",
                "title": "Contact",
                "icon": "chat",
                "subItems": [
                    { "name": "GitHub", "url": "https://github.com/{github.username}", "icon": "github" },
                    { "name": "Home", "url": "/", "icon": "home", "action": "internal_link" }
                ]
            },
            { "id": "blog", "title": "Blog", "icon": "book", "dynamicContent": "blog" }
        ],
        "icons": { "chat": "M0,0" }
    }"#;

    fn site() -> SiteConfig {
        SiteConfig::from_lookup(|key| match key {
            "GITHUB_USERNAME" => Some(String::from("octo")),
            _ => None,
        })
    }

    #[test]
    fn parses_and_substitutes_templates() {
        let structure = parse_menu_structure(MINIMAL, &site()).expect("valid structure");
        let contact = &structure.menu_items[0];
        assert_eq!(contact.sub_items[0].url, "https://github.com/octo");
        assert_eq!(contact.sub_items[0].action, ActionType::ExternalLink);
        assert_eq!(contact.sub_items[1].action, ActionType::InternalLink);

        let blog = &structure.menu_items[1];
        assert!(blog.sub_items.is_empty());
        assert_eq!(blog.dynamic_content.as_deref(), Some("blog"));
        assert_eq!(structure.icons["chat"], "M0,0");
    }

    #[test]
    fn validation_reports_every_problem() {
        let structure = MenuStructure {
            menu_items: vec![
                MenuEntry {
                    id: String::from("a"),
                    title: String::from("A"),
                    icon: String::new(),
                    sub_items: Vec::new(),
                    dynamic_content: None,
                },
                MenuEntry {
                    id: String::from("a"),
                    title: String::from(" "),
                    icon: String::new(),
                    sub_items: Vec::new(),
                    dynamic_content: None,
                },
                MenuEntry {
                    id: String::new(),
                    title: String::from("C"),
                    icon: String::new(),
                    sub_items: Vec::new(),
                    dynamic_content: None,
                },
            ],
            icons: HashMap::new(),
        };
        assert_eq!(
            structure.validate(),
            vec![
                MenuSchemaError::DuplicateId {
                    id: String::from("a")
                },
                MenuSchemaError::EmptyTitle {
                    id: String::from("a")
                },
                MenuSchemaError::EmptyId { index: 2 },
            ]
        );
    }

    #[test]
    fn empty_structures_are_rejected() {
        let error = parse_menu_structure(r#"{ "menuItems": [] }"#, &site()).expect_err("empty");
        assert_eq!(error, MenuSchemaError::NoItems);
        assert!(matches!(
            parse_menu_structure("{", &site()),
            Err(MenuSchemaError::Parse(_))
        ));
    }

    #[test]
    fn embedded_structure_is_valid() {
        let structure = parse_menu_structure(super::super::MENU_STRUCTURE_JSON, &site())
            .expect("embedded structure");
        assert!(structure.validate().is_empty());
        assert!(structure.menu_items.len() >= 2);
    }

    #[test]
    fn fallback_is_valid() {
        assert!(MenuStructure::fallback().validate().is_empty());
    }
}
