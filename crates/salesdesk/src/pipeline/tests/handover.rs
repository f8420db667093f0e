use chrono::Duration;

use super::common::{
    agent, build_harness, build_harness_with_geo, epoch, intake, StaticGeo, TestHarness,
};
use crate::pipeline::dispatch::GeoPoint;
use crate::pipeline::domain::{AgentId, AgentRole, AgentStatus, LeadStage, VisitStatus};
use crate::pipeline::handover::{
    visit_overdue, CheckInError, CheckInRequest, GatePassError, VisitError,
};
use crate::pipeline::repository::LeadRepository;
use crate::pipeline::service::PipelineError;

fn check_in_request(name: &str, mobile: &str, source: &str) -> CheckInRequest {
    CheckInRequest {
        name: name.to_string(),
        mobile: mobile.to_string(),
        project: "Skyline Heights".to_string(),
        declared_source: source.to_string(),
        override_source_conflict: false,
        geo: None,
    }
}

fn registered_lead(harness: &TestHarness, mobile: &str) -> crate::pipeline::domain::Lead {
    harness
        .service
        .intake_lead(intake("Asha Rao", mobile), epoch())
        .expect("intake lead")
}

#[test]
fn walk_in_with_unknown_mobile_opens_a_negotiation_lead() {
    let harness = build_harness();
    let outcome = harness
        .service
        .check_in(
            check_in_request("Vikram Shah", "9000000001", "Walk-in"),
            epoch(),
        )
        .expect("check-in");

    assert!(outcome.created_new_lead);
    assert_eq!(outcome.lead.stage, LeadStage::Negotiation);
    assert_eq!(outcome.lead.visits.len(), 1);
    assert_eq!(outcome.lead.visits[0].status, VisitStatus::Waiting);

    // Direct hand-over to the least-recently-served online sales agent.
    let handover = outcome.handover.expect("handover performed");
    assert_eq!(handover.from, None);
    assert_eq!(handover.to, Some(AgentId("s1".to_string())));
    assert_eq!(outcome.lead.assigned_agent, Some(AgentId("s1".to_string())));
}

#[test]
fn known_mobile_on_the_same_project_is_a_revisit() {
    let harness = build_harness();
    let lead = registered_lead(&harness, "9000000002");

    let outcome = harness
        .service
        .check_in(
            check_in_request("Asha Rao", "9000000002", "Website"),
            epoch() + Duration::days(1),
        )
        .expect("check-in");

    assert!(!outcome.created_new_lead);
    assert_eq!(outcome.lead.id, lead.id);
    assert_eq!(outcome.lead.visits.len(), 1);
}

#[test]
fn hand_over_replaces_the_presales_assignment() {
    let harness = build_harness();
    let lead = registered_lead(&harness, "9000000003");
    assert_eq!(lead.assigned_agent, Some(AgentId("p1".to_string())));

    let outcome = harness
        .service
        .check_in(
            check_in_request("Asha Rao", "9000000003", "Website"),
            epoch() + Duration::days(1),
        )
        .expect("check-in");

    let handover = outcome.handover.expect("handover performed");
    assert_eq!(handover.from, Some(AgentId("p1".to_string())));
    assert_eq!(handover.to, Some(AgentId("s1".to_string())));
    assert!(outcome
        .lead
        .remarks
        .iter()
        .any(|remark| remark.text.contains("hand-over: p1 -> s1")));
}

#[test]
fn lead_already_with_sales_is_not_handed_over_again() {
    let harness = build_harness();
    registered_lead(&harness, "9000000004");
    harness
        .service
        .check_in(
            check_in_request("Asha Rao", "9000000004", "Website"),
            epoch() + Duration::days(1),
        )
        .expect("first check-in");

    let second = harness
        .service
        .check_in(
            check_in_request("Asha Rao", "9000000004", "Website"),
            epoch() + Duration::days(2),
        )
        .expect("second check-in");

    assert_eq!(second.handover, None);
    assert_eq!(second.lead.assigned_agent, Some(AgentId("s1".to_string())));
    assert_eq!(second.lead.visits.len(), 2);
}

#[test]
fn no_online_sales_agent_leaves_the_lead_unassigned() {
    let harness = build_harness();
    let mut s1 = agent("s1", AgentRole::Sales, 90);
    s1.status = AgentStatus::Busy;
    let mut s2 = agent("s2", AgentRole::Sales, 30);
    s2.status = AgentStatus::Offline;
    harness
        .agents
        .seed(vec![agent("p1", AgentRole::Presales, 60), s1, s2]);

    let outcome = harness
        .service
        .check_in(
            check_in_request("Vikram Shah", "9000000005", "Walk-in"),
            epoch(),
        )
        .expect("check-in");

    let handover = outcome.handover.expect("handover attempted");
    assert_eq!(handover.to, None);
    assert_eq!(outcome.lead.assigned_agent, None);
    assert!(outcome
        .lead
        .remarks
        .iter()
        .any(|remark| remark.text.contains("left unassigned")));
}

#[test]
fn source_conflict_blocks_unless_overridden() {
    let harness = build_harness();
    registered_lead(&harness, "9000000006");

    let result = harness.service.check_in(
        check_in_request("Asha Rao", "9000000006", "Channel Partner"),
        epoch() + Duration::days(1),
    );
    match result {
        Err(PipelineError::CheckIn(CheckInError::SourceConflict { recorded, declared })) => {
            assert_eq!(recorded, "Website");
            assert_eq!(declared, "Channel Partner");
        }
        other => panic!("expected source conflict, got {other:?}"),
    }

    let mut overridden = check_in_request("Asha Rao", "9000000006", "Channel Partner");
    overridden.override_source_conflict = true;
    let outcome = harness
        .service
        .check_in(overridden, epoch() + Duration::days(1))
        .expect("overridden check-in");

    // Recorded source stays; the override is logged, not applied silently.
    assert_eq!(outcome.lead.source, "Website");
    assert!(outcome
        .lead
        .remarks
        .iter()
        .any(|remark| remark.text.contains("source conflict overridden")));
}

#[test]
fn far_device_location_warns_but_does_not_block() {
    let harness = build_harness_with_geo(StaticGeo {
        distance: Some(1_200.0),
    });
    let mut request = check_in_request("Vikram Shah", "9000000007", "Walk-in");
    request.geo = Some(GeoPoint {
        latitude: 19.07,
        longitude: 72.88,
    });

    let outcome = harness.service.check_in(request, epoch()).expect("check-in");
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("1200m")));
}

#[test]
fn geo_provider_failure_degrades_to_a_warning() {
    let harness = build_harness_with_geo(StaticGeo { distance: None });
    let mut request = check_in_request("Vikram Shah", "9000000008", "Walk-in");
    request.geo = Some(GeoPoint {
        latitude: 19.07,
        longitude: 72.88,
    });

    let outcome = harness.service.check_in(request, epoch()).expect("check-in");
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("geo verification skipped")));
}

#[test]
fn notifier_outage_never_fails_a_check_in() {
    let harness = build_harness();
    harness.notifier.set_failing(true);

    let outcome = harness
        .service
        .check_in(
            check_in_request("Vikram Shah", "9000000009", "Walk-in"),
            epoch(),
        )
        .expect("check-in");
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("notification not sent")));
}

#[test]
fn gate_pass_scan_is_single_use() {
    let harness = build_harness();
    let lead = registered_lead(&harness, "9000000010");
    let pass = harness
        .service
        .issue_gate_pass(&lead.id, epoch())
        .expect("issue pass");

    let outcome = harness
        .service
        .scan_gate_pass(&pass.token, epoch() + Duration::hours(2))
        .expect("first scan");
    assert_eq!(outcome.lead.id, lead.id);
    assert!(!outcome.created_new_lead);
    assert_eq!(outcome.lead.visits.len(), 1);

    let second = harness
        .service
        .scan_gate_pass(&pass.token, epoch() + Duration::hours(3));
    assert!(matches!(
        second,
        Err(PipelineError::GatePass(GatePassError::AlreadyUsed))
    ));
}

#[test]
fn unknown_and_expired_gate_passes_fail_distinctly() {
    let harness = build_harness();
    let lead = registered_lead(&harness, "9000000011");

    let unknown = harness.service.scan_gate_pass("GP-nope", epoch());
    assert!(matches!(
        unknown,
        Err(PipelineError::GatePass(GatePassError::NotFound))
    ));

    let pass = harness
        .service
        .issue_gate_pass(&lead.id, epoch())
        .expect("issue pass");
    let expired = harness
        .service
        .scan_gate_pass(&pass.token, epoch() + Duration::hours(25));
    assert!(matches!(
        expired,
        Err(PipelineError::GatePass(GatePassError::Expired))
    ));

    // An expired pass is not consumed.
    let stored = harness
        .leads
        .fetch(&lead.id)
        .expect("fetch")
        .expect("lead");
    assert!(!stored.gate_pass.expect("pass kept").used);
}

#[test]
fn gate_pass_scan_hands_the_lead_to_sales() {
    let harness = build_harness();
    let lead = registered_lead(&harness, "9000000012");
    let pass = harness
        .service
        .issue_gate_pass(&lead.id, epoch())
        .expect("issue pass");

    let outcome = harness
        .service
        .scan_gate_pass(&pass.token, epoch() + Duration::hours(1))
        .expect("scan");
    let handover = outcome.handover.expect("handover performed");
    assert_eq!(handover.from, Some(AgentId("p1".to_string())));
    assert_eq!(handover.to, Some(AgentId("s1".to_string())));
}

#[test]
fn visits_advance_forward_only() {
    let harness = build_harness();
    let outcome = harness
        .service
        .check_in(
            check_in_request("Vikram Shah", "9000000013", "Walk-in"),
            epoch(),
        )
        .expect("check-in");

    let skipped = harness
        .service
        .advance_visit(&outcome.lead.id, &outcome.visit_id, VisitStatus::Completed);
    assert!(matches!(
        skipped,
        Err(PipelineError::Visit(VisitError::InvalidTransition {
            from: VisitStatus::Waiting,
            to: VisitStatus::Completed,
        }))
    ));

    let meeting = harness
        .service
        .advance_visit(&outcome.lead.id, &outcome.visit_id, VisitStatus::InMeeting)
        .expect("to meeting");
    assert_eq!(meeting.status, VisitStatus::InMeeting);

    let done = harness
        .service
        .advance_visit(&outcome.lead.id, &outcome.visit_id, VisitStatus::Completed)
        .expect("to completed");
    assert_eq!(done.status, VisitStatus::Completed);
}

#[test]
fn waiting_visits_turn_overdue_after_the_threshold() {
    let harness = build_harness();
    let outcome = harness
        .service
        .check_in(
            check_in_request("Vikram Shah", "9000000014", "Walk-in"),
            epoch(),
        )
        .expect("check-in");
    let visit = outcome
        .lead
        .visit(&outcome.visit_id)
        .expect("visit on lead")
        .clone();

    assert!(!visit_overdue(&visit, epoch() + Duration::minutes(10)));
    assert!(visit_overdue(&visit, epoch() + Duration::minutes(16)));

    let mut in_meeting = visit;
    in_meeting.status = VisitStatus::InMeeting;
    assert!(!visit_overdue(&in_meeting, epoch() + Duration::hours(1)));
}
