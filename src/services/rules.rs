// src/services/rules.rs

//! Field rules for event containers.
//!
//! Each rule owns one field (or one tightly coupled group such as the links
//! or the status pair) and never looks at what other rules produced, except
//! that the links rule may use an `id` set earlier. Text fields are built from
//! ordered [`TextStrategy`] lists where the first success wins.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result, StepError, StepResult};
use crate::models::{EventRecord, StatusKind};
use crate::utils::text::{clean, non_empty};
use crate::utils::url::{participants_url, resolve_url};

/// Label used for events the listing implies are over.
pub const FINISHED_LABEL: &str = "Finalizado";

/// One parsed container fragment.
pub struct Container {
    html: Html,
}

impl Container {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_fragment(markup),
        }
    }

    /// The outermost element of the fragment.
    pub fn root(&self) -> Option<ElementRef<'_>> {
        self.html.root_element().children().find_map(ElementRef::wrap)
    }

    pub fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> {
        self.html.select(selector)
    }

    /// Cleaned text of every element matching `selector`, in document order.
    pub fn texts(&self, selector: &Selector) -> Vec<String> {
        self.select(selector)
            .map(|el| non_empty(&el.text().collect::<String>()).unwrap_or_default())
            .collect()
    }
}

/// Compile a CSS selector.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Extraction of one field (or field group) from a container.
pub trait FieldRule: Send + Sync {
    fn field(&self) -> &'static str;

    /// Write the field into `record`, or report why it is absent.
    fn apply(&self, container: &Container, record: &mut EventRecord) -> StepResult<()>;
}

/// One way of finding a text value.
pub trait TextStrategy: Send + Sync {
    fn attempt(&self, container: &Container) -> StepResult<String>;
}

/// Plain text fields of [`EventRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Name,
    DateRange,
    Organization,
    Club,
    Location,
    CountryFlag,
}

impl TextField {
    fn name(self) -> &'static str {
        match self {
            TextField::Name => "name",
            TextField::DateRange => "dateRange",
            TextField::Organization => "organization",
            TextField::Club => "club",
            TextField::Location => "location",
            TextField::CountryFlag => "countryFlag",
        }
    }

    fn slot(self, record: &mut EventRecord) -> &mut Option<String> {
        match self {
            TextField::Name => &mut record.name,
            TextField::DateRange => &mut record.date_range,
            TextField::Organization => &mut record.organization,
            TextField::Club => &mut record.club,
            TextField::Location => &mut record.location,
            TextField::CountryFlag => &mut record.country_flag,
        }
    }
}

/// A text field filled by the first successful strategy.
pub struct TextRule {
    field: TextField,
    strategies: Vec<Box<dyn TextStrategy>>,
}

impl TextRule {
    pub fn new(field: TextField, strategies: Vec<Box<dyn TextStrategy>>) -> Self {
        Self { field, strategies }
    }
}

impl FieldRule for TextRule {
    fn field(&self) -> &'static str {
        self.field.name()
    }

    fn apply(&self, container: &Container, record: &mut EventRecord) -> StepResult<()> {
        let mut last_err = StepError::not_found(self.field.name());
        for strategy in &self.strategies {
            match strategy.attempt(container) {
                Ok(value) => {
                    *self.field.slot(record) = Some(value);
                    return Ok(());
                }
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }
}

// --- Text strategies ---

/// Text of the first matching element.
pub struct FirstMatch(pub Selector);

impl TextStrategy for FirstMatch {
    fn attempt(&self, container: &Container) -> StepResult<String> {
        let el = container
            .select(&self.0)
            .next()
            .ok_or_else(|| StepError::not_found("first match"))?;
        non_empty(&el.text().collect::<String>()).ok_or_else(|| StepError::malformed("empty text"))
    }
}

/// Text of the element at a fixed position among all matches.
pub struct NthMatch {
    pub selector: Selector,
    pub index: usize,
}

impl TextStrategy for NthMatch {
    fn attempt(&self, container: &Container) -> StepResult<String> {
        let el = container
            .select(&self.selector)
            .nth(self.index)
            .ok_or_else(|| StepError::not_found(format!("match #{}", self.index + 1)))?;
        non_empty(&el.text().collect::<String>()).ok_or_else(|| StepError::malformed("empty text"))
    }
}

/// First text that does not look like a location.
pub struct FirstNonLocation {
    pub selector: Selector,
    pub countries: Vec<String>,
}

impl TextStrategy for FirstNonLocation {
    fn attempt(&self, container: &Container) -> StepResult<String> {
        container
            .texts(&self.selector)
            .into_iter()
            .find(|t| {
                !t.is_empty()
                    && !t.contains('/')
                    && !self.countries.iter().any(|c| t.contains(c.as_str()))
            })
            .ok_or_else(|| StepError::not_found("non-location text"))
    }
}

/// First slash-separated text naming a known place.
pub struct KnownPlace {
    pub selector: Selector,
    pub tokens: Vec<String>,
}

impl TextStrategy for KnownPlace {
    fn attempt(&self, container: &Container) -> StepResult<String> {
        container
            .texts(&self.selector)
            .into_iter()
            .find(|t| t.contains('/') && self.tokens.iter().any(|p| t.contains(p.as_str())))
            .ok_or_else(|| StepError::not_found("known place"))
    }
}

/// First slash-separated text shorter than a ceiling.
pub struct ShortSlashed {
    pub selector: Selector,
    pub max_len: usize,
}

impl TextStrategy for ShortSlashed {
    fn attempt(&self, container: &Container) -> StepResult<String> {
        container
            .texts(&self.selector)
            .into_iter()
            .find(|t| t.contains('/') && t.chars().count() < self.max_len)
            .ok_or_else(|| StepError::not_found("slash-separated text"))
    }
}

/// Always yields the same value.
pub struct Constant(pub String);

impl TextStrategy for Constant {
    fn attempt(&self, _container: &Container) -> StepResult<String> {
        Ok(self.0.clone())
    }
}

// --- Structured rules ---

/// Identifier from the container's `id` attribute.
pub struct IdRule {
    pub prefix: String,
    /// Descendant fallback when the root carries no id
    pub fallback: Selector,
}

impl FieldRule for IdRule {
    fn field(&self) -> &'static str {
        "id"
    }

    fn apply(&self, container: &Container, record: &mut EventRecord) -> StepResult<()> {
        let raw = container
            .root()
            .and_then(|root| root.value().attr("id"))
            .filter(|id| !id.trim().is_empty())
            .or_else(|| {
                container
                    .select(&self.fallback)
                    .find_map(|el| el.value().attr("id"))
            })
            .ok_or_else(|| StepError::not_found("container id"))?;

        let raw = raw.trim();
        let id = raw.strip_prefix(self.prefix.as_str()).unwrap_or(raw);
        if id.is_empty() {
            return Err(StepError::malformed(format!("container id '{raw}'")));
        }
        record.id = Some(id.to_string());
        Ok(())
    }
}

/// Info, participants and runs links.
pub struct LinksRule {
    pub base: Url,
    pub anchors: Selector,
}

impl LinksRule {
    const INFO: &'static str = "/info/";
    const PARTICIPANT_TERMS: [&'static str; 2] = ["/participants", "/participantes"];
    const PARTICIPANT_PAGES: [&'static str; 2] = ["/participants_list", "/participantes"];
    const RUNS: &'static str = "/runs";

    fn hrefs<'a>(&'a self, container: &'a Container) -> Vec<&'a str> {
        container
            .select(&self.anchors)
            .filter_map(|a| a.value().attr("href"))
            .collect()
    }
}

impl FieldRule for LinksRule {
    fn field(&self) -> &'static str {
        "links"
    }

    fn apply(&self, container: &Container, record: &mut EventRecord) -> StepResult<()> {
        let hrefs = self.hrefs(container);
        let resolve = |href: &str| resolve_url(&self.base, href);

        record.links.info = hrefs
            .iter()
            .find(|h| h.contains(Self::INFO))
            .map(|h| resolve(h));

        record.links.participants = hrefs
            .iter()
            .filter(|h| Self::PARTICIPANT_TERMS.iter().any(|t| h.contains(*t)))
            .find(|h| Self::PARTICIPANT_PAGES.iter().any(|p| h.contains(*p)))
            .map(|h| resolve(h))
            .or_else(|| record.id.as_deref().map(|id| participants_url(&self.base, id)));

        record.links.runs = hrefs
            .iter()
            .find(|h| h.contains(Self::RUNS))
            .map(|h| resolve(h));

        if record.links.is_empty() {
            return Err(StepError::not_found("links"));
        }
        Ok(())
    }
}

/// Status badge text and its classification.
pub struct StatusRule {
    pub badge: Selector,
    pub finished_keywords: Vec<String>,
    /// Default when no badge exists
    pub assume_finished: bool,
}

impl StatusRule {
    fn classify(&self, text: &str) -> StatusKind {
        if !text.is_empty()
            && self
                .finished_keywords
                .iter()
                .any(|k| text.contains(k.as_str()))
        {
            StatusKind::Finished
        } else {
            StatusKind::Unknown
        }
    }
}

impl FieldRule for StatusRule {
    fn field(&self) -> &'static str {
        "status"
    }

    fn apply(&self, container: &Container, record: &mut EventRecord) -> StepResult<()> {
        // A badge that exists decides the status even when its text is blank
        let badge = container
            .select(&self.badge)
            .next()
            .map(|el| clean(&el.text().collect::<String>()));

        match badge {
            Some(text) => {
                record.status_kind = Some(self.classify(&text));
                record.status = Some(text);
                Ok(())
            }
            None if self.assume_finished => {
                record.status = Some(FINISHED_LABEL.to_string());
                record.status_kind = Some(StatusKind::Finished);
                Ok(())
            }
            None => Err(StepError::not_found("status badge")),
        }
    }
}
