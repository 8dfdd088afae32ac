// SPDX-License-Identifier: AGPL-3.0-or-later

use std::convert::Infallible;
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::config::Locales;

/// Which locale rows a read should return.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocaleFilter {
    /// Every stored locale, localized fields come back as `{ locale: value }` maps.
    #[default]
    All,

    /// One locale, falling back to the default locale where a value is missing.
    Locale(String),
}

impl LocaleFilter {
    /// Locales which have to be loaded from the database to answer a read with this filter,
    /// `None` when all of them are needed.
    pub fn locales_to_load(&self, locales: &Locales) -> Option<Vec<String>> {
        match self {
            LocaleFilter::All => None,
            LocaleFilter::Locale(locale) => {
                let mut requested = vec![locale.to_owned()];
                if locale != locales.default_locale() {
                    requested.push(locales.default_locale().to_owned());
                }
                Some(requested)
            }
        }
    }
}

impl FromStr for LocaleFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "all" | "*" => LocaleFilter::All,
            locale => LocaleFilter::Locale(locale.to_owned()),
        })
    }
}

impl Display for LocaleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocaleFilter::All => write!(f, "all"),
            LocaleFilter::Locale(locale) => write!(f, "{}", locale),
        }
    }
}
