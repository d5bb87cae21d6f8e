//! Posts for the column whose `dynamicContent` is `"blog"`.
//!
//! Posts are markdown files under `<data_dir>/blog`, each opening with a
//! YAML frontmatter block:
//!
//! ```text
//! ---
//! title: Hello
//! date: 2024-05-01
//! excerpt: Optional one-liner
//! ---
//! ```
//!
//! Only the frontmatter is read. The body supplies the excerpt when the
//! frontmatter has none.
use std::{
    error::Error,
    fmt,
    path::{Path, PathBuf},
};

use bevy::prelude::*;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::systems::navigation::ActionType;

use super::schema::{MenuStructure, SubEntry};

pub const BLOG_FEED: &str = "blog";
pub const BLOG_DIR: &str = "blog";
const EXCERPT_CHARS: usize = 120;

/// Posts read from disk, ready to replace the blog column's sub-items.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct BlogPostsLoaded {
    pub posts: Vec<BlogPost>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlogPost {
    pub slug: String,
    pub title: String,
    pub date: Option<NaiveDate>,
    pub excerpt: String,
}

#[derive(Debug, Deserialize)]
struct Frontmatter {
    title: String,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    excerpt: Option<String>,
}

#[derive(Debug)]
pub enum BlogError {
    Io(std::io::Error),
    MissingFrontmatter,
    Frontmatter(serde_yaml::Error),
}

impl fmt::Display for BlogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "post could not be read: {err}"),
            Self::MissingFrontmatter => write!(f, "post has no `---` frontmatter block"),
            Self::Frontmatter(err) => write!(f, "post frontmatter is invalid: {err}"),
        }
    }
}

impl Error for BlogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Frontmatter(err) => Some(err),
            Self::MissingFrontmatter => None,
        }
    }
}

impl From<std::io::Error> for BlogError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl BlogPost {
    pub fn parse(slug: &str, text: &str) -> Result<Self, BlogError> {
        let rest = text
            .trim_start_matches('\u{feff}')
            .trim_start()
            .strip_prefix("---")
            .ok_or(BlogError::MissingFrontmatter)?;
        let end = rest.find("\n---").ok_or(BlogError::MissingFrontmatter)?;
        let frontmatter: Frontmatter =
            serde_yaml::from_str(&rest[..end]).map_err(BlogError::Frontmatter)?;

        let body = rest[end + 4..]
            .lines()
            .skip(1)
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .unwrap_or_default();
        let excerpt = frontmatter
            .excerpt
            .unwrap_or_else(|| body.chars().take(EXCERPT_CHARS).collect());

        Ok(Self {
            slug: slug.to_string(),
            title: frontmatter.title,
            date: frontmatter.date,
            excerpt,
        })
    }

    /// Title on the first line, date under it when known.
    pub fn label(&self) -> String {
        match self.date {
            Some(date) => format!("{}\n{}", self.title, date.format("%b %-d, %Y")),
            None => self.title.clone(),
        }
    }

    pub fn to_sub_entry(&self) -> SubEntry {
        SubEntry {
            name: self.label(),
            url: format!("/blog/{}", self.slug),
            icon: String::from("book"),
            action: ActionType::InternalLink,
        }
    }
}

pub fn blog_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(BLOG_DIR)
}

/// Every readable post in `dir`, newest first. Undated posts sort last.
/// A missing directory is not an error; unreadable posts are skipped.
pub fn read_posts(dir: &Path) -> Vec<BlogPost> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("no blog posts at {}: {err}", dir.display());
            return Vec::new();
        }
    };

    let mut posts: Vec<BlogPost> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .filter_map(|path| {
            let slug = path.file_stem()?.to_string_lossy().into_owned();
            let parsed = std::fs::read_to_string(&path)
                .map_err(BlogError::from)
                .and_then(|text| BlogPost::parse(&slug, &text));
            match parsed {
                Ok(post) => Some(post),
                Err(err) => {
                    warn!("skipping {}: {err}", path.display());
                    None
                }
            }
        })
        .collect();

    posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.title.cmp(&b.title)));
    posts
}

/// Replaces the sub-items of every column fed by `feed`. Returns how many
/// columns changed.
pub fn inject_posts(structure: &mut MenuStructure, feed: &str, posts: &[BlogPost]) -> usize {
    let mut replaced = 0;
    for entry in &mut structure.menu_items {
        if entry.dynamic_content.as_deref() == Some(feed) {
            entry.sub_items = posts.iter().map(BlogPost::to_sub_entry).collect();
            replaced += 1;
        }
    }
    replaced
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::scenes::menu::schema::MenuEntry;

    const POST: &str = "---\ntitle: Shipping the menu\ndate: 2024-05-01\n---\n\n# Heading\n\nFirst paragraph of the post.\n";

    #[test]
    fn frontmatter_supplies_title_and_date() {
        let post = BlogPost::parse("shipping", POST).expect("valid post");
        assert_eq!(post.title, "Shipping the menu");
        assert_eq!(post.date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(post.excerpt, "First paragraph of the post.");
        assert_eq!(post.label(), "Shipping the menu\nMay 1, 2024");

        let entry = post.to_sub_entry();
        assert_eq!(entry.url, "/blog/shipping");
        assert_eq!(entry.action, ActionType::InternalLink);
    }

    #[test]
    fn posts_without_frontmatter_are_rejected() {
        assert!(matches!(
            BlogPost::parse("plain", "# Just markdown\n"),
            Err(BlogError::MissingFrontmatter)
        ));
        assert!(matches!(
            BlogPost::parse("bad", "---\ndate: 2024-05-01\n---\n"),
            Err(BlogError::Frontmatter(_))
        ));
    }

    #[test]
    fn directory_is_read_newest_first() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("older.md"), "---\ntitle: Older\ndate: 2023-01-02\n---\n")
            .expect("write");
        fs::write(dir.path().join("newer.md"), POST).expect("write");
        fs::write(dir.path().join("undated.md"), "---\ntitle: Undated\n---\n").expect("write");
        fs::write(dir.path().join("broken.md"), "no frontmatter").expect("write");
        fs::write(dir.path().join("notes.txt"), "---\ntitle: Ignored\n---\n").expect("write");

        let slugs: Vec<String> = read_posts(dir.path())
            .into_iter()
            .map(|post| post.slug)
            .collect();
        assert_eq!(slugs, vec!["newer", "older", "undated"]);

        assert!(read_posts(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn only_the_fed_column_is_replaced() {
        let entry = |id: &str, feed: Option<&str>| MenuEntry {
            id: id.to_string(),
            title: id.to_string(),
            icon: String::new(),
            sub_items: Vec::new(),
            dynamic_content: feed.map(str::to_string),
        };
        let mut structure = MenuStructure {
            menu_items: vec![entry("about", None), entry("blog", Some(BLOG_FEED))],
            icons: Default::default(),
        };
        let post = BlogPost::parse("shipping", POST).expect("valid post");

        assert_eq!(inject_posts(&mut structure, BLOG_FEED, &[post]), 1);
        assert!(structure.menu_items[0].sub_items.is_empty());
        assert_eq!(structure.menu_items[1].sub_items.len(), 1);
    }
}
