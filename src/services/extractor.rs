// src/services/extractor.rs

//! Event container extraction.
//!
//! Maps one container's markup to an [`EventRecord`] by running a fixed,
//! ordered list of [`FieldRule`]s. A rule that cannot find its target leaves
//! its field absent; extraction itself never fails.

use url::Url;

use crate::error::Result;
use crate::models::{Config, EventRecord};
use crate::services::rules::{
    Constant, Container, FieldRule, FirstMatch, FirstNonLocation, IdRule, KnownPlace, LinksRule,
    NthMatch, ShortSlashed, StatusRule, TextField, TextRule, TextStrategy, parse_selector,
};

/// Event name node.
const NAME: &str = "div.font-caption.text-lg.text-black.truncate";
/// Generic "small text" nodes: date, organization, club and location.
const SMALL_TEXT: &str = "div.text-xs";
const CLUB: &str = "div[class='text-xs mb-0.5 mt-0.5']";
const STATUS_BADGE: &str = "div.py-1.px-4.border.text-white.font-bold.rounded.text-sm";
const FLAG: &str = "div.text-md";
const ANCHORS: &str = "a[href]";

const ID_PREFIX: &str = "event-card-";
const ID_FALLBACK: &str = "[id^='event-card-']";

/// Converts container markup into records.
pub struct RecordExtractor {
    rules: Vec<Box<dyn FieldRule>>,
}

impl RecordExtractor {
    /// Build the standard rule set.
    pub fn new(config: &Config) -> Result<Self> {
        let ex = &config.extractor;
        let base = Url::parse(&config.site.base_url)?;
        let small = || parse_selector(SMALL_TEXT);

        let mut flag: Vec<Box<dyn TextStrategy>> = vec![Box::new(FirstMatch(parse_selector(FLAG)?))];
        if let Some(default_flag) = ex.fallback_flag() {
            flag.push(Box::new(Constant(default_flag.to_string())));
        }

        let rules: Vec<Box<dyn FieldRule>> = vec![
            Box::new(IdRule {
                prefix: ID_PREFIX.to_string(),
                fallback: parse_selector(ID_FALLBACK)?,
            }),
            Box::new(TextRule::new(
                TextField::Name,
                vec![Box::new(FirstMatch(parse_selector(NAME)?))],
            )),
            Box::new(TextRule::new(
                TextField::DateRange,
                vec![Box::new(NthMatch { selector: small()?, index: 0 })],
            )),
            Box::new(TextRule::new(
                TextField::Organization,
                vec![Box::new(NthMatch { selector: small()?, index: 1 })],
            )),
            Box::new(TextRule::new(
                TextField::Club,
                vec![
                    Box::new(FirstMatch(parse_selector(CLUB)?)),
                    Box::new(FirstNonLocation {
                        selector: small()?,
                        countries: ex.country_tokens.clone(),
                    }),
                ],
            )),
            Box::new(TextRule::new(
                TextField::Location,
                vec![
                    Box::new(KnownPlace {
                        selector: small()?,
                        tokens: ex.location_tokens.clone(),
                    }),
                    Box::new(ShortSlashed {
                        selector: small()?,
                        max_len: ex.location_max_len,
                    }),
                ],
            )),
            Box::new(LinksRule {
                base,
                anchors: parse_selector(ANCHORS)?,
            }),
            Box::new(StatusRule {
                badge: parse_selector(STATUS_BADGE)?,
                finished_keywords: ex.finished_keywords.clone(),
                assume_finished: ex.assume_finished,
            }),
            Box::new(TextRule::new(TextField::CountryFlag, flag)),
        ];

        Ok(Self::with_rules(rules))
    }

    /// Use a custom rule list, applied in order.
    pub fn with_rules(rules: Vec<Box<dyn FieldRule>>) -> Self {
        Self { rules }
    }

    /// Extract a record from one container. Never fails.
    pub fn extract(&self, markup: &str) -> EventRecord {
        let container = Container::parse(markup);
        let mut record = EventRecord::default();
        for rule in &self.rules {
            if let Err(e) = rule.apply(&container, &mut record) {
                log::trace!("Field {} absent: {}", rule.field(), e);
            }
        }
        record
    }
}
