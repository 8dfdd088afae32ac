// SPDX-License-Identifier: AGPL-3.0-or-later

mod config;
mod db;
mod helpers;
mod runner;

pub use config::TEST_CONFIG;
pub use db::initialize_db;
pub use helpers::{article_collection, article_document, author_collection, locales};
pub use runner::test_runner;
