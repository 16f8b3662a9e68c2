use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::migration::{MigrationError, MigrationPhase, MigrationSummary, WorkflowMode};
use crate::webex::{AccessToken, Person, Recording, Site};

/// Whose recordings the period selection covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum PersonSelection {
    Everyone,
    Person(String),
}

impl PersonSelection {
    /// `"all"` (or an empty value) selects everyone.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            Self::Everyone
        } else {
            Self::Person(value.to_string())
        }
    }
}

/// Everything one browser session remembers between steps.
#[derive(Debug)]
pub struct SessionContext {
    pub mode: WorkflowMode,
    pub phase: MigrationPhase,
    pub token: Option<AccessToken>,
    /// Anti-forgery value sent with the authorize redirect
    pub oauth_state: Option<String>,
    pub sites: Vec<Site>,
    pub selected_site: Option<String>,
    pub people: Vec<Person>,
    pub selected_person: Option<PersonSelection>,
    /// Listing of the latest enumeration, replaced on every round
    pub recordings: Vec<Recording>,
    pub last_summary: Option<MigrationSummary>,
}

impl SessionContext {
    pub fn new(mode: WorkflowMode) -> Self {
        Self {
            mode,
            phase: MigrationPhase::Login,
            token: None,
            oauth_state: None,
            sites: Vec::new(),
            selected_site: None,
            people: Vec::new(),
            selected_person: None,
            recordings: Vec::new(),
            last_summary: None,
        }
    }

    pub fn require_token(&mut self) -> Result<AccessToken, MigrationError> {
        self.require_token_at(Utc::now())
    }

    /// An expired token is dropped and the session goes back to login.
    pub fn require_token_at(&mut self, now: DateTime<Utc>) -> Result<AccessToken, MigrationError> {
        match &self.token {
            None => Err(MigrationError::NotAuthenticated),
            Some(token) if token.is_expired_at(now) => {
                self.token = None;
                self.phase = MigrationPhase::Login;
                Err(MigrationError::TokenExpired)
            }
            Some(token) => Ok(token.clone()),
        }
    }

    /// Stores a fresh token and resets everything selected with the old one.
    pub fn authenticate(&mut self, token: AccessToken) {
        self.token = Some(token);
        self.oauth_state = None;
        self.sites.clear();
        self.people.clear();
        self.selected_site = None;
        self.selected_person = None;
        self.recordings.clear();
        self.last_summary = None;
        self.phase = MigrationPhase::SelectPeriod;
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_ref().is_some_and(|token| !token.is_expired())
    }
}
