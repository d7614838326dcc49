//! Request target construction for the E-utilities endpoints.
//!
//! Endpoints:
//!   einfo:   <base>einfo.fcgi   (database metadata)
//!   esearch: <base>esearch.fcgi (term search, counts, history cursor)
//!   efetch:  <base>efetch.fcgi  (article records)
//!
//! Only the recognised options in [`UrlOption`] can be attached to a target,
//! and only the ones explicitly requested when the target is built.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use litscan_common::{LitscanError, Result};
use serde::{Deserialize, Serialize};
use url::form_urlencoded::byte_serialize;

use crate::document::DocumentFormat;
use crate::query::SearchQuery;

/// Options the builder recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlOption {
    Db,
    Retmax,
    Retmode,
    Field,
    Usehistory,
}

impl UrlOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlOption::Db         => "db",
            UrlOption::Retmax     => "retmax",
            UrlOption::Retmode    => "retmode",
            UrlOption::Field      => "field",
            UrlOption::Usehistory => "usehistory",
        }
    }
}

impl FromStr for UrlOption {
    type Err = LitscanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "db"         => Ok(UrlOption::Db),
            "retmax"     => Ok(UrlOption::Retmax),
            "retmode"    => Ok(UrlOption::Retmode),
            "field"      => Ok(UrlOption::Field),
            "usehistory" => Ok(UrlOption::Usehistory),
            other => Err(LitscanError::Configuration(format!("Unknown URL option: {other}"))),
        }
    }
}

/// Which remote endpoint a target addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    Info,
    Search,
    Fetch,
}

impl Endpoint {
    fn path(&self) -> &'static str {
        match self {
            Endpoint::Info   => "einfo.fcgi",
            Endpoint::Search => "esearch.fcgi",
            Endpoint::Fetch  => "efetch.fcgi",
        }
    }

    /// Info and search pages are read leniently; article sets are strict XML.
    pub fn format(&self) -> DocumentFormat {
        match self {
            Endpoint::Info | Endpoint::Search => DocumentFormat::Markup,
            Endpoint::Fetch                   => DocumentFormat::Xml,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Endpoint::Info   => "info",
            Endpoint::Search => "search",
            Endpoint::Fetch  => "fetch",
        })
    }
}

/// A fully composed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub endpoint: Endpoint,
    pub url: String,
}

impl Target {
    pub fn format(&self) -> DocumentFormat {
        self.endpoint.format()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.endpoint, self.url)
    }
}

/// Builder for the three endpoint targets.
#[derive(Debug, Clone)]
pub struct Urls {
    base: String,
    settings: BTreeMap<UrlOption, String>,
    info: Option<String>,
    search: Option<String>,
    fetch: Option<String>,
}

impl Urls {
    pub fn new(base: impl Into<String>) -> Self {
        let mut base = base.into();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self {
            base,
            settings: BTreeMap::new(),
            info: None,
            search: None,
            fetch: None,
        }
    }

    /// Build from untyped `(key, value)` pairs; unknown keys are rejected and
    /// `None` values leave the option unset.
    pub fn from_settings<'a, I>(base: impl Into<String>, pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, Option<String>)>,
    {
        let mut urls = Self::new(base);
        for (key, value) in pairs {
            let option: UrlOption = key.parse()?;
            if let Some(value) = value {
                urls.set(option, value);
            }
        }
        Ok(urls)
    }

    pub fn set(&mut self, option: UrlOption, value: impl Into<String>) -> &mut Self {
        self.settings.insert(option, value.into());
        self
    }

    pub fn with(mut self, option: UrlOption, value: impl Into<String>) -> Self {
        self.set(option, value);
        self
    }

    pub fn setting(&self, option: UrlOption) -> Option<&str> {
        self.settings.get(&option).map(String::as_str)
    }

    fn make_args(&self, endpoint: Endpoint, options: &[UrlOption]) -> Result<String> {
        let mut args = Vec::with_capacity(options.len());
        for option in options {
            let value = self.settings.get(option).ok_or_else(|| {
                LitscanError::Configuration(format!(
                    "Option '{}' requested for the {} target but not configured",
                    option.as_str(),
                    endpoint
                ))
            })?;
            args.push(format!("{}={}", option.as_str(), encode(value)));
        }
        Ok(format!("{}{}?{}", self.base, endpoint.path(), args.join("&")))
    }

    pub fn build_info(&mut self, options: &[UrlOption]) -> Result<()> {
        self.info = Some(self.make_args(Endpoint::Info, options)?);
        Ok(())
    }

    pub fn build_search(&mut self, options: &[UrlOption]) -> Result<()> {
        self.search = Some(self.make_args(Endpoint::Search, options)?);
        Ok(())
    }

    pub fn build_fetch(&mut self, options: &[UrlOption]) -> Result<()> {
        self.fetch = Some(self.make_args(Endpoint::Fetch, options)?);
        Ok(())
    }

    fn built(&self, endpoint: Endpoint) -> Result<&str> {
        let slot = match endpoint {
            Endpoint::Info   => &self.info,
            Endpoint::Search => &self.search,
            Endpoint::Fetch  => &self.fetch,
        };
        slot.as_deref().ok_or_else(|| {
            LitscanError::Configuration(format!("The {} target has not been built", endpoint))
        })
    }

    pub fn info_target(&self) -> Result<Target> {
        Ok(Target { endpoint: Endpoint::Info, url: self.built(Endpoint::Info)?.to_string() })
    }

    pub fn search_target(&self, query: &SearchQuery) -> Result<Target> {
        let url = format!("{}&term={}", self.built(Endpoint::Search)?, encode(query.as_str()));
        Ok(Target { endpoint: Endpoint::Search, url })
    }

    /// Fetch target for an explicit id list.
    pub fn fetch_ids_target(&self, ids: &[u64]) -> Result<Target> {
        let ids = ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",");
        let url = format!("{}&id={}", self.built(Endpoint::Fetch)?, ids);
        Ok(Target { endpoint: Endpoint::Fetch, url })
    }

    /// Fetch target for one page of a history-cursor result set.
    pub fn fetch_page_target(
        &self,
        web_env: &str,
        query_key: &str,
        retstart: u64,
        retmax: u64,
    ) -> Result<Target> {
        let url = format!(
            "{}&WebEnv={}&query_key={}&retstart={}&retmax={}",
            self.built(Endpoint::Fetch)?,
            encode(web_env),
            encode(query_key),
            retstart,
            retmax
        );
        Ok(Target { endpoint: Endpoint::Fetch, url })
    }
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}
