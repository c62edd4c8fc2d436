use crate::db::{Database, StoreError};
use crate::models::{
    EventStatus, Nomination, Role, SurveyEvaluation, User, Vote, VotingEvent,
};
use crate::tally::{self, Phase, PhaseStatus, Standing, VoteCount};
use chrono::{DateTime, Duration, Utc};
use log::info;
use std::sync::Arc;
use thiserror::Error;

// Survey answers are on a 1-10 scale.
const MIN_SCORE: u8 = 1;
const MAX_SCORE: u8 = 10;
// Nobody gets more than three picks on a ballot.
const MAX_SELECTIONS: usize = 3;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("voting event not found: {0}")]
    EventNotFound(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("month label must not be empty")]
    EmptyMonthLabel,
    #[error("event must end after the 14-day voting boundary")]
    InvalidEventWindow,
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: EventStatus, to: EventStatus },
    #[error("event is not active")]
    EventNotActive,
    #[error("event is not in its {expected:?} phase")]
    WrongPhase { expected: Phase },
    #[error("only supervisors may nominate")]
    NotASupervisor,
    #[error("a ballot may select at most {max} nominees, got {got}")]
    TooManySelections { got: usize, max: usize },
    #[error("duplicate selection: {0}")]
    DuplicateSelection(String),
    #[error("not a nominee of this event: {0}")]
    NotANominee(String),
    #[error("voting for yourself is not allowed")]
    SelfVote,
    #[error("evaluating yourself is not allowed")]
    SelfEvaluation,
    #[error("expected {expected} survey scores, got {got}")]
    ScoreCountMismatch { expected: usize, got: usize },
    #[error("survey scores must be between 1 and 10")]
    ScoreOutOfRange,
}

// Final outcome of a closed event: the persisted winner plus the full
// ranked tally behind it.
#[derive(Debug, Clone)]
pub struct EventResults {
    pub winner_id: Option<String>,
    pub counts: Vec<VoteCount>,
}

// Write-path rules for the voting lifecycle. All phase and role gating
// lives here so the tally functions stay pure. Callers pass `now` so the
// rules are checked against one instant.
#[derive(Clone)]
pub struct Service {
    db: Arc<Database>,
}

impl Service {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // A new monthly event starts Pending. Windows that would leave no room
    // for the evaluation phase are rejected outright rather than producing
    // an event that can never be classified past day 14.
    pub async fn create_event(
        &self,
        month_label: &str,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        questions: Vec<String>,
    ) -> Result<VotingEvent, ServiceError> {
        if month_label.trim().is_empty() {
            return Err(ServiceError::EmptyMonthLabel);
        }
        if end_date <= start_date + Duration::days(tally::phase::VOTING_DAYS) {
            return Err(ServiceError::InvalidEventWindow);
        }

        let event = VotingEvent::new(
            month_label.to_string(),
            start_date,
            end_date,
            questions,
        );
        self.db.create_event(&event).await?;
        info!("created voting event {} ({})", event.id, event.month_label);

        Ok(event)
    }

    pub async fn activate_event(&self, event_id: &str) -> Result<(), ServiceError> {
        let event = self.require_event(event_id).await?;
        if event.status != EventStatus::Pending {
            return Err(ServiceError::InvalidTransition {
                from: event.status,
                to: EventStatus::Active,
            });
        }
        if event.start_date.is_none() || event.end_date.is_none() {
            return Err(ServiceError::InvalidEventWindow);
        }

        self.db
            .set_event_status(event_id, EventStatus::Active)
            .await?;
        info!("activated voting event {event_id}");

        Ok(())
    }

    // Closing tallies the event and persists the winner in the same step.
    pub async fn close_event(&self, event_id: &str) -> Result<Option<String>, ServiceError> {
        let snapshot = self
            .db
            .event_snapshot(event_id)
            .await?
            .ok_or_else(|| ServiceError::EventNotFound(event_id.to_string()))?;

        if snapshot.event.status != EventStatus::Active {
            return Err(ServiceError::InvalidTransition {
                from: snapshot.event.status,
                to: EventStatus::Closed,
            });
        }

        let winner = tally::votes::event_winner(&snapshot.nominations, &snapshot.votes);
        self.db
            .set_event_winner(event_id, winner.as_deref())
            .await?;
        self.db
            .set_event_status(event_id, EventStatus::Closed)
            .await?;

        match &winner {
            Some(id) => info!("closed voting event {event_id}, winner {id}"),
            None => info!("closed voting event {event_id} with no winner"),
        }

        Ok(winner)
    }

    pub async fn nominate(
        &self,
        event_id: &str,
        collaborator_id: &str,
        nominated_by_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Nomination, ServiceError> {
        let event = self.require_event(event_id).await?;
        self.require_phase(&event, Phase::Nomination, now)?;

        let nominator = self.require_user(nominated_by_id).await?;
        if !matches!(nominator.role, Role::Supervisor | Role::Admin) {
            return Err(ServiceError::NotASupervisor);
        }
        self.require_user(collaborator_id).await?;

        let nomination = Nomination::new(
            event_id.to_string(),
            collaborator_id.to_string(),
            nominated_by_id.to_string(),
        );
        self.db.insert_nomination(&nomination).await?;

        Ok(nomination)
    }

    // An empty ballot is a valid abstention. Re-voting replaces the
    // voter's previous ballot for this event.
    pub async fn cast_vote(
        &self,
        event_id: &str,
        voter_id: &str,
        selections: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Vote, ServiceError> {
        let event = self.require_event(event_id).await?;
        self.require_phase(&event, Phase::Voting, now)?;
        self.require_user(voter_id).await?;

        let nominations = self.db.nominations_for_event(event_id).await?;
        let pool = tally::votes::nominee_pool(&nominations);

        let max = pool.len().saturating_sub(1).min(MAX_SELECTIONS);
        if selections.len() > max {
            return Err(ServiceError::TooManySelections {
                got: selections.len(),
                max,
            });
        }
        for (i, id) in selections.iter().enumerate() {
            if selections[..i].contains(id) {
                return Err(ServiceError::DuplicateSelection(id.clone()));
            }
            if !pool.contains(id) {
                return Err(ServiceError::NotANominee(id.clone()));
            }
            if id == voter_id {
                return Err(ServiceError::SelfVote);
            }
        }

        let vote = Vote::new(event_id.to_string(), voter_id.to_string(), selections);
        self.db.save_vote(&vote).await?;

        Ok(vote)
    }

    // One answer per survey question, each on the 1-10 scale. Re-submitting
    // replaces the evaluator's previous answers for this nominee.
    pub async fn submit_evaluation(
        &self,
        event_id: &str,
        evaluator_id: &str,
        evaluated_user_id: &str,
        scores: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Result<SurveyEvaluation, ServiceError> {
        let event = self.require_event(event_id).await?;
        self.require_phase(&event, Phase::Evaluation, now)?;
        self.require_user(evaluator_id).await?;

        if evaluator_id == evaluated_user_id {
            return Err(ServiceError::SelfEvaluation);
        }

        let nominations = self.db.nominations_for_event(event_id).await?;
        let pool = tally::votes::nominee_pool(&nominations);
        if !pool.contains(evaluated_user_id) {
            return Err(ServiceError::NotANominee(evaluated_user_id.to_string()));
        }

        if scores.len() != event.questions.len() {
            return Err(ServiceError::ScoreCountMismatch {
                expected: event.questions.len(),
                got: scores.len(),
            });
        }
        if scores.iter().any(|&s| !(MIN_SCORE..=MAX_SCORE).contains(&s)) {
            return Err(ServiceError::ScoreOutOfRange);
        }

        let evaluation = SurveyEvaluation::new(
            event_id.to_string(),
            evaluator_id.to_string(),
            evaluated_user_id.to_string(),
            scores,
        );
        self.db.save_evaluation(&evaluation).await?;

        Ok(evaluation)
    }

    // Real-time standings from peer evaluations, for display while an
    // event is active.
    pub async fn standings(&self, event_id: &str) -> Result<Vec<Standing>, ServiceError> {
        let snapshot = self
            .db
            .event_snapshot(event_id)
            .await?
            .ok_or_else(|| ServiceError::EventNotFound(event_id.to_string()))?;

        let pool = tally::votes::nominee_pool(&snapshot.nominations);
        Ok(tally::scores::rank_standings(&pool, &snapshot.evaluations))
    }

    // Ranked tally behind a closed event's winner. Uses the same
    // nomination-count fallback as the winner computation so the ranking
    // and the persisted winner always agree.
    pub async fn results(&self, event_id: &str) -> Result<EventResults, ServiceError> {
        let snapshot = self
            .db
            .event_snapshot(event_id)
            .await?
            .ok_or_else(|| ServiceError::EventNotFound(event_id.to_string()))?;

        let pool = tally::votes::nominee_pool(&snapshot.nominations);
        let mut counts = tally::votes::vote_counts(&pool, &snapshot.votes);
        if counts.values().sum::<u64>() == 0 {
            counts = tally::votes::nomination_counts(&pool, &snapshot.nominations);
        }

        Ok(EventResults {
            winner_id: snapshot.event.winner_id,
            counts: tally::votes::ranked_counts(&counts),
        })
    }

    pub async fn active_events(&self) -> Result<Vec<VotingEvent>, ServiceError> {
        Ok(self.db.list_active_events().await?)
    }

    pub fn phase_of(&self, event: &VotingEvent, now: DateTime<Utc>) -> Option<PhaseStatus> {
        if event.status != EventStatus::Active {
            return None;
        }
        tally::phase::classify(event.start_date, event.end_date, now)
    }

    async fn require_event(&self, event_id: &str) -> Result<VotingEvent, ServiceError> {
        self.db
            .get_event(event_id)
            .await?
            .ok_or_else(|| ServiceError::EventNotFound(event_id.to_string()))
    }

    async fn require_user(&self, user_id: &str) -> Result<User, ServiceError> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))
    }

    fn require_phase(
        &self,
        event: &VotingEvent,
        expected: Phase,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if event.status != EventStatus::Active {
            return Err(ServiceError::EventNotActive);
        }
        match tally::phase::classify(event.start_date, event.end_date, now) {
            Some(status) if status.phase == expected => Ok(()),
            _ => Err(ServiceError::WrongPhase { expected }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Department;
    use chrono::TimeZone;

    async fn service() -> Service {
        let db = Database::connect_in_memory().await.expect("in-memory database");
        Service::new(Arc::new(db))
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn end() -> DateTime<Utc> {
        start() + Duration::days(21)
    }

    fn nomination_time() -> DateTime<Utc> {
        start() + Duration::days(2)
    }

    fn voting_time() -> DateTime<Utc> {
        start() + Duration::days(10)
    }

    fn evaluation_time() -> DateTime<Utc> {
        start() + Duration::days(16)
    }

    async fn add_user(svc: &Service, id: &str, role: Role) {
        svc.db
            .upsert_user(&User {
                id: id.into(),
                name: format!("User {id}"),
                department: Department::Sales,
                role,
                avatar: None,
            })
            .await
            .unwrap();
    }

    // Event with supervisor s1 and collaborators a, b, c nominated.
    async fn active_event_with_nominees(svc: &Service) -> VotingEvent {
        add_user(svc, "s1", Role::Supervisor).await;
        for id in ["a", "b", "c"] {
            add_user(svc, id, Role::Collaborator).await;
        }

        let event = svc
            .create_event("March 2024", start(), end(), vec!["Teamwork?".into()])
            .await
            .unwrap();
        svc.activate_event(&event.id).await.unwrap();

        for id in ["a", "b", "c"] {
            svc.nominate(&event.id, id, "s1", nomination_time())
                .await
                .unwrap();
        }

        event
    }

    #[tokio::test]
    async fn rejects_blank_month_label() {
        let svc = service().await;
        let result = svc.create_event("  ", start(), end(), vec![]).await;
        assert!(matches!(result, Err(ServiceError::EmptyMonthLabel)));
    }

    #[tokio::test]
    async fn rejects_window_ending_before_voting_boundary() {
        let svc = service().await;
        let result = svc
            .create_event("March 2024", start(), start() + Duration::days(14), vec![])
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidEventWindow)));
    }

    #[tokio::test]
    async fn status_transitions_are_monotonic() {
        let svc = service().await;
        let event = svc
            .create_event("March 2024", start(), end(), vec![])
            .await
            .unwrap();

        // Pending cannot be closed directly.
        assert!(matches!(
            svc.close_event(&event.id).await,
            Err(ServiceError::InvalidTransition { .. })
        ));

        svc.activate_event(&event.id).await.unwrap();
        // Active cannot be re-activated.
        assert!(matches!(
            svc.activate_event(&event.id).await,
            Err(ServiceError::InvalidTransition { .. })
        ));

        svc.close_event(&event.id).await.unwrap();
        // Closed is terminal.
        assert!(matches!(
            svc.close_event(&event.id).await,
            Err(ServiceError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn nomination_requires_supervisor_and_phase() {
        let svc = service().await;
        add_user(&svc, "s1", Role::Supervisor).await;
        add_user(&svc, "c1", Role::Collaborator).await;
        add_user(&svc, "c2", Role::Collaborator).await;

        let event = svc
            .create_event("March 2024", start(), end(), vec![])
            .await
            .unwrap();

        // Pending event accepts no nominations.
        assert!(matches!(
            svc.nominate(&event.id, "c1", "s1", nomination_time()).await,
            Err(ServiceError::EventNotActive)
        ));

        svc.activate_event(&event.id).await.unwrap();

        assert!(matches!(
            svc.nominate(&event.id, "c1", "c2", nomination_time()).await,
            Err(ServiceError::NotASupervisor)
        ));
        assert!(matches!(
            svc.nominate(&event.id, "c1", "s1", voting_time()).await,
            Err(ServiceError::WrongPhase { expected: Phase::Nomination })
        ));

        svc.nominate(&event.id, "c1", "s1", nomination_time())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ballot_validation() {
        let svc = service().await;
        let event = active_event_with_nominees(&svc).await;
        add_user(&svc, "v1", Role::Collaborator).await;

        // Outside the voting window.
        assert!(matches!(
            svc.cast_vote(&event.id, "v1", vec!["a".into()], nomination_time())
                .await,
            Err(ServiceError::WrongPhase { expected: Phase::Voting })
        ));

        // Pool of 3 caps a ballot at 2 picks.
        assert!(matches!(
            svc.cast_vote(
                &event.id,
                "v1",
                vec!["a".into(), "b".into(), "c".into()],
                voting_time(),
            )
            .await,
            Err(ServiceError::TooManySelections { got: 3, max: 2 })
        ));

        assert!(matches!(
            svc.cast_vote(&event.id, "v1", vec!["a".into(), "a".into()], voting_time())
                .await,
            Err(ServiceError::DuplicateSelection(_))
        ));

        assert!(matches!(
            svc.cast_vote(&event.id, "v1", vec!["z".into()], voting_time())
                .await,
            Err(ServiceError::NotANominee(_))
        ));

        assert!(matches!(
            svc.cast_vote(&event.id, "a", vec!["a".into()], voting_time())
                .await,
            Err(ServiceError::SelfVote)
        ));

        // Abstention and a normal ballot both go through.
        svc.cast_vote(&event.id, "v1", vec![], voting_time())
            .await
            .unwrap();
        svc.cast_vote(&event.id, "v1", vec!["a".into(), "b".into()], voting_time())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn evaluation_validation() {
        let svc = service().await;
        let event = active_event_with_nominees(&svc).await;
        add_user(&svc, "e1", Role::Collaborator).await;

        assert!(matches!(
            svc.submit_evaluation(&event.id, "e1", "a", vec![8], voting_time())
                .await,
            Err(ServiceError::WrongPhase { expected: Phase::Evaluation })
        ));

        assert!(matches!(
            svc.submit_evaluation(&event.id, "a", "a", vec![8], evaluation_time())
                .await,
            Err(ServiceError::SelfEvaluation)
        ));

        assert!(matches!(
            svc.submit_evaluation(&event.id, "e1", "z", vec![8], evaluation_time())
                .await,
            Err(ServiceError::NotANominee(_))
        ));

        // The event has one survey question.
        assert!(matches!(
            svc.submit_evaluation(&event.id, "e1", "a", vec![8, 9], evaluation_time())
                .await,
            Err(ServiceError::ScoreCountMismatch { expected: 1, got: 2 })
        ));

        assert!(matches!(
            svc.submit_evaluation(&event.id, "e1", "a", vec![0], evaluation_time())
                .await,
            Err(ServiceError::ScoreOutOfRange)
        ));
        assert!(matches!(
            svc.submit_evaluation(&event.id, "e1", "a", vec![11], evaluation_time())
                .await,
            Err(ServiceError::ScoreOutOfRange)
        ));

        svc.submit_evaluation(&event.id, "e1", "a", vec![8], evaluation_time())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn closing_persists_winner_and_results_agree() {
        let svc = service().await;
        let event = active_event_with_nominees(&svc).await;
        add_user(&svc, "v1", Role::Collaborator).await;
        add_user(&svc, "v2", Role::Collaborator).await;

        svc.cast_vote(&event.id, "v1", vec!["b".into()], voting_time())
            .await
            .unwrap();
        svc.cast_vote(&event.id, "v2", vec!["b".into(), "c".into()], voting_time())
            .await
            .unwrap();

        let winner = svc.close_event(&event.id).await.unwrap();
        assert_eq!(winner, Some("b".to_string()));

        let results = svc.results(&event.id).await.unwrap();
        assert_eq!(results.winner_id, Some("b".to_string()));
        assert_eq!(results.counts[0].collaborator_id, "b");
        assert_eq!(results.counts[0].count, 2);
        assert_eq!(results.counts[0].rank, 1);
    }

    #[tokio::test]
    async fn closing_without_votes_uses_nomination_fallback() {
        let svc = service().await;
        add_user(&svc, "s1", Role::Supervisor).await;
        add_user(&svc, "a", Role::Collaborator).await;
        add_user(&svc, "b", Role::Collaborator).await;

        let event = svc
            .create_event("March 2024", start(), end(), vec![])
            .await
            .unwrap();
        svc.activate_event(&event.id).await.unwrap();

        for _ in 0..3 {
            svc.nominate(&event.id, "a", "s1", nomination_time())
                .await
                .unwrap();
        }
        svc.nominate(&event.id, "b", "s1", nomination_time())
            .await
            .unwrap();

        assert_eq!(svc.close_event(&event.id).await.unwrap(), Some("a".into()));
    }

    #[tokio::test]
    async fn standings_rank_evaluated_nominees() {
        let svc = service().await;
        let event = active_event_with_nominees(&svc).await;
        add_user(&svc, "e1", Role::Collaborator).await;

        svc.submit_evaluation(&event.id, "e1", "b", vec![9], evaluation_time())
            .await
            .unwrap();
        svc.submit_evaluation(&event.id, "e1", "c", vec![5], evaluation_time())
            .await
            .unwrap();

        let standings = svc.standings(&event.id).await.unwrap();
        assert_eq!(standings[0].collaborator_id, "b");
        assert_eq!(standings[0].score, Some(90));
        assert_eq!(standings[2].collaborator_id, "a");
        assert_eq!(standings[2].score, None);
    }

    #[tokio::test]
    async fn phase_of_requires_active_status() {
        let svc = service().await;
        let event = svc
            .create_event("March 2024", start(), end(), vec![])
            .await
            .unwrap();

        assert!(svc.phase_of(&event, nomination_time()).is_none());

        svc.activate_event(&event.id).await.unwrap();
        let refreshed = svc.db.get_event(&event.id).await.unwrap().unwrap();
        let status = svc.phase_of(&refreshed, nomination_time()).unwrap();
        assert_eq!(status.phase, Phase::Nomination);
    }
}
