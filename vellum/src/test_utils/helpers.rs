// SPDX-License-Identifier: AGPL-3.0-or-later

use rstest::fixture;
use serde_json::{json, Value};

use crate::config::Locales;
use crate::schema::Collection;

/// Locales used throughout the tests: English as default, Spanish as second locale.
#[fixture]
pub fn locales() -> Locales {
    Locales::new("en", &["en".to_string(), "es".to_string()])
}

/// Schema config of the "articles" collection, covering every field type.
fn article_config() -> Value {
    json!({
        "fields": [
            { "name": "title", "type": "text", "localized": true, "required": true },
            { "name": "slug", "type": "text", "unique": true },
            { "name": "views", "type": "number", "numberType": "integer" },
            { "name": "price", "type": "number", "numberType": "decimal" },
            { "name": "rating", "type": "number" },
            { "name": "published", "type": "checkbox" },
            { "name": "publishedOn", "type": "date", "dateType": "date" },
            { "name": "publishedAt", "type": "date" },
            { "name": "status", "type": "select", "options": ["draft", "published"] },
            {
                "name": "seo",
                "type": "group",
                "fields": [
                    { "name": "description", "type": "textarea", "localized": true },
                    { "name": "keywords", "type": "json" }
                ]
            },
            {
                "name": "images",
                "type": "array",
                "fields": [
                    { "name": "alt", "type": "text", "localized": true },
                    { "name": "caption", "type": "text" },
                    { "name": "file", "type": "upload" }
                ]
            },
            {
                "name": "content",
                "type": "blocks",
                "blocks": [
                    {
                        "name": "hero",
                        "fields": [
                            { "name": "heading", "type": "text" },
                            { "name": "subtitle", "type": "text" }
                        ]
                    },
                    {
                        "name": "gallery",
                        "fields": [
                            {
                                "name": "images",
                                "type": "array",
                                "fields": [{ "name": "caption", "type": "text" }]
                            }
                        ]
                    }
                ]
            },
            { "name": "authors", "type": "relation", "relationTo": "authors", "hasMany": true },
            { "name": "category", "type": "relation", "relationTo": "categories" },
            { "name": "cover", "type": "image" },
            { "name": "body", "type": "richText", "localized": true },
            { "name": "metadata", "type": "json" }
        ]
    })
}

/// Collection with groups, arrays, blocks, relations and localized fields.
pub fn article_collection() -> Collection {
    Collection::from_json(&article_config()).unwrap()
}

/// Minimal collection for documents other articles can point at.
pub fn author_collection() -> Collection {
    Collection::from_json(&json!({
        "fields": [
            { "name": "name", "type": "text" },
            { "name": "bio", "type": "textarea", "localized": true }
        ]
    }))
    .unwrap()
}

/// A document of the "articles" collection touching every store kind but relations.
pub fn article_document(title: &str) -> Value {
    json!({
        "title": title,
        "slug": title.to_lowercase().replace(' ', "-"),
        "views": 42,
        "rating": 4.5,
        "published": true,
        "publishedAt": "2024-05-01T10:00:00+00:00",
        "seo": { "description": "An article" },
        "images": [
            {
                "alt": "A cat",
                "file": { "filename": "cat.png", "mimeType": "image/png", "fileSize": 1024 }
            }
        ],
        "content": [
            { "type": "block", "name": "hero", "fields": { "heading": "Welcome" } }
        ],
        "metadata": { "source": "test" }
    })
}
