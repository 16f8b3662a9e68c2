//! User-facing steps of a session's migration flow.
//!
//! Every step takes the shared [`Migrator`] and the caller's own
//! [`SessionContext`], checks that the session is in a phase where the step
//! makes sense, and returns a serializable view of the result.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use super::{
    mark_in_storage, KeyNaming, MigrationError, MigrationOutcome, MigrationPhase,
    MigrationSummary, Migrator, TransferError, TransferPolicy, WorkflowMode,
};
use crate::session::{PersonSelection, SessionContext};
use crate::webex::{AccessToken, Person, Recording, RecordingPeriod, Site};

/// Labels shared by every view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowLabels {
    pub mode: WorkflowMode,
    /// "Copy" or "Migrate"
    pub action: String,
    /// "AWS" or "Local"
    pub destination: String,
}

impl FlowLabels {
    fn new(migrator: &Migrator, mode: WorkflowMode) -> Self {
        Self {
            mode,
            action: migrator.policy().action_label().to_string(),
            destination: migrator.destination().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginView {
    #[serde(flatten)]
    pub labels: FlowLabels,
    pub phase: MigrationPhase,
    pub login_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerView {
    #[serde(flatten)]
    pub labels: FlowLabels,
    pub phase: MigrationPhase,
    pub sites: Vec<Site>,
    /// Empty in bulk mode, which always covers everyone
    pub people: Vec<Person>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingView {
    #[serde(flatten)]
    pub labels: FlowLabels,
    pub phase: MigrationPhase,
    pub site: String,
    pub period: RecordingPeriod,
    pub recordings: Vec<Recording>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryView {
    #[serde(flatten)]
    pub labels: FlowLabels,
    pub phase: MigrationPhase,
    #[serde(flatten)]
    pub summary: MigrationSummary,
}

/// What `select_period` produced, depending on the session's mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum PeriodView {
    Listing(ListingView),
    Summary(SummaryView),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PeriodSelection {
    #[serde(alias = "fromdate")]
    pub from_date: String,
    #[serde(alias = "todate")]
    pub to_date: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub person: String,
}

fn expect_phase(
    context: &SessionContext,
    action: &'static str,
    allowed: &[MigrationPhase],
) -> Result<(), MigrationError> {
    if allowed.contains(&context.phase) {
        Ok(())
    } else {
        Err(MigrationError::InvalidStep {
            action,
            phase: context.phase.as_str(),
        })
    }
}

pub fn login_view(migrator: &Migrator, context: &SessionContext, login_url: &str) -> LoginView {
    LoginView {
        labels: FlowLabels::new(migrator, context.mode),
        phase: context.phase,
        login_url: login_url.to_string(),
    }
}

/// Exchanges the authorization code and loads the sites (and, in
/// interactive mode, the people) the user can choose from.
pub async fn complete_login(
    migrator: &Migrator,
    context: &mut SessionContext,
    code: &str,
    state: Option<&str>,
) -> Result<SchedulerView, MigrationError> {
    // one-shot: consumed whether or not it matches
    let issued = context.oauth_state.take();
    match (issued.as_deref(), state) {
        (Some(expected), Some(received)) if expected == received => {}
        (None, _) => {
            warn!("OAuth callback arrived without a pending login");
            return Err(MigrationError::StateMismatch);
        }
        _ => {
            warn!("OAuth callback carried an unexpected state value");
            return Err(MigrationError::StateMismatch);
        }
    }

    let token = migrator.provider().exchange_code(code).await?;
    match token.expires_at() {
        Some(expires_at) => info!("Logged in to Webex, token valid until {}", expires_at),
        None => info!("Logged in to Webex"),
    }
    context.authenticate(token.clone());

    load_directory(migrator, context, &token).await?;
    Ok(scheduler_view(migrator, context))
}

/// Sites and people for an already authenticated session.
pub async fn scheduler(
    migrator: &Migrator,
    context: &mut SessionContext,
) -> Result<SchedulerView, MigrationError> {
    let token = context.require_token()?;
    if context.sites.is_empty() {
        load_directory(migrator, context, &token).await?;
    }
    Ok(scheduler_view(migrator, context))
}

async fn load_directory(
    migrator: &Migrator,
    context: &mut SessionContext,
    token: &AccessToken,
) -> Result<(), MigrationError> {
    context.sites = migrator.provider().list_sites(token).await?;
    info!("Loaded {} site(s)", context.sites.len());

    if context.mode == WorkflowMode::Interactive {
        context.people = migrator.provider().list_people(token).await?;
        info!("Loaded {} person(s)", context.people.len());
    }
    Ok(())
}

fn scheduler_view(migrator: &Migrator, context: &SessionContext) -> SchedulerView {
    SchedulerView {
        labels: FlowLabels::new(migrator, context.mode),
        phase: context.phase,
        sites: context.sites.clone(),
        people: context.people.clone(),
    }
}

/// Runs the enumeration for the chosen period. Bulk sessions carry on
/// through transfer to the summary; interactive sessions stop at the
/// flagged listing.
pub async fn select_period(
    migrator: &Migrator,
    context: &mut SessionContext,
    selection: &PeriodSelection,
) -> Result<PeriodView, MigrationError> {
    let token = context.require_token()?;
    expect_phase(
        context,
        "select a period",
        &[
            MigrationPhase::SelectPeriod,
            MigrationPhase::SelectRecordings,
            MigrationPhase::Summary,
        ],
    )?;
    let period = RecordingPeriod::parse(&selection.from_date, &selection.to_date)?;
    let site = resolve_site(context, &selection.site);
    info!(
        "Selected period {} - {} on site {} ({} mode)",
        period.from,
        period.to,
        site,
        context.mode.as_str()
    );

    let previous = context.phase;
    context.phase = MigrationPhase::Enumerate;
    let result = match context.mode {
        WorkflowMode::Bulk => bulk_period(migrator, context, &token, &period, &site).await,
        WorkflowMode::Interactive => {
            interactive_period(migrator, context, &token, &period, &site, &selection.person)
                .await
        }
    };
    if result.is_err() {
        context.phase = previous;
    }
    result
}

fn resolve_site(context: &SessionContext, requested: &str) -> String {
    let requested = requested.trim();
    if !requested.is_empty() {
        return requested.to_string();
    }
    context
        .sites
        .iter()
        .find(|site| site.default)
        .or_else(|| context.sites.first())
        .map(|site| site.site_url.clone())
        .unwrap_or_default()
}

async fn bulk_period(
    migrator: &Migrator,
    context: &mut SessionContext,
    token: &AccessToken,
    period: &RecordingPeriod,
    site: &str,
) -> Result<PeriodView, MigrationError> {
    context.selected_site = Some(site.to_string());
    context.selected_person = Some(PersonSelection::Everyone);

    let summary = migrator.run_bulk(token, period, site).await?;
    context.recordings.clear();
    context.last_summary = Some(summary.clone());
    context.phase = MigrationPhase::Summary;

    Ok(PeriodView::Summary(SummaryView {
        labels: FlowLabels::new(migrator, context.mode),
        phase: context.phase,
        summary,
    }))
}

async fn interactive_period(
    migrator: &Migrator,
    context: &mut SessionContext,
    token: &AccessToken,
    period: &RecordingPeriod,
    site: &str,
    person: &str,
) -> Result<PeriodView, MigrationError> {
    let selection = PersonSelection::parse(person);
    let stored = migrator.stored_keys().await?;

    let mut recordings = match &selection {
        PersonSelection::Person(id) => migrator.enumerate_person(token, period, site, id).await?,
        PersonSelection::Everyone => {
            if context.people.is_empty() {
                context.people = migrator.provider().list_people(token).await?;
            }
            migrator
                .enumerate_everyone(token, period, site, &context.people)
                .await?
        }
    };

    context.phase = MigrationPhase::Deduplicate;
    mark_in_storage(&mut recordings, &stored);
    info!(
        "Listed {} recording(s), {} already stored",
        recordings.len(),
        recordings.iter().filter(|r| r.in_storage).count()
    );

    context.selected_site = Some(site.to_string());
    context.selected_person = Some(selection);
    context.recordings = recordings;
    context.phase = MigrationPhase::SelectRecordings;

    Ok(PeriodView::Listing(ListingView {
        labels: FlowLabels::new(migrator, context.mode),
        phase: context.phase,
        site: site.to_string(),
        period: *period,
        recordings: context.recordings.clone(),
    }))
}

/// Transfers the chosen recordings of the current listing.
///
/// Repeated ids are transferred once; ids missing from the listing are
/// reported as failures.
pub async fn select_recordings(
    migrator: &Migrator,
    context: &mut SessionContext,
    recording_ids: &[String],
) -> Result<SummaryView, MigrationError> {
    if context.mode != WorkflowMode::Interactive {
        return Err(MigrationError::InvalidStep {
            action: "select recordings",
            phase: context.phase.as_str(),
        });
    }
    let token = context.require_token()?;
    expect_phase(
        context,
        "select recordings",
        &[MigrationPhase::SelectRecordings, MigrationPhase::Summary],
    )?;

    let mut seen = HashSet::new();
    let requested: Vec<&str> = recording_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty() && seen.insert(*id))
        .collect();

    let selected: Vec<Recording> = requested
        .iter()
        .filter_map(|id| context.recordings.iter().find(|r| r.id == *id))
        .cloned()
        .collect();
    info!(
        "Selected {} recording(s), {} found in the listing",
        requested.len(),
        selected.len()
    );

    context.phase = MigrationPhase::Transfer;
    let mut transferred = migrator
        .transfer(&token, &selected, KeyNaming::Topic)
        .await
        .into_iter();

    let listed: HashSet<&str> = selected.iter().map(|r| r.id.as_str()).collect();
    let mut outcomes = Vec::with_capacity(requested.len());
    for id in &requested {
        if listed.contains(id) {
            outcomes.extend(transferred.next());
        } else {
            outcomes.push(MigrationOutcome::Failed {
                id: id.to_string(),
                reason: TransferError::NotListed(id.to_string()),
            });
        }
    }

    if migrator.policy() == TransferPolicy::Migrate {
        context.phase = MigrationPhase::DeleteSource;
    }
    let summary = migrator.finish(&token, &selected, outcomes).await;

    match migrator.stored_keys().await {
        Ok(stored) => mark_in_storage(&mut context.recordings, &stored),
        Err(e) => warn!("Could not refresh storage flags: {}", e),
    }

    context.last_summary = Some(summary.clone());
    context.phase = MigrationPhase::Summary;
    Ok(SummaryView {
        labels: FlowLabels::new(migrator, context.mode),
        phase: context.phase,
        summary,
    })
}
