use crate::infra::{
    seed_agents, seed_units, InMemoryAgentRepository, InMemoryBookingRepository,
    InMemoryLeadRepository, InMemoryUnitRepository, LoggingNotifier, ProjectSiteGeo,
};
use chrono::{Duration, Utc};
use clap::Args;
use salesdesk::error::AppError;
use salesdesk::pipeline::{
    milestone_display_status, CostSheet, DiscountInput, IntakeGuard, LeadIntake, PaymentPlan,
    PipelineService, PricingConfig, QuickAction, QuoteEngine, QuoteStatus, Unit, UnitId,
    UnitStatus, VisitStatus,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct CostSheetArgs {
    /// Saleable area of the unit
    #[arg(long)]
    pub(crate) area: u32,
    /// Floor the unit sits on
    #[arg(long)]
    pub(crate) floor: u32,
    /// Discount per unit of area
    #[arg(long, default_value_t = 0)]
    pub(crate) discount_per_area: i64,
    /// Include the fixed parking charge
    #[arg(long)]
    pub(crate) include_parking: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Discount per unit of area applied to the demo quote
    #[arg(long, default_value_t = 100)]
    pub(crate) discount_per_area: i64,
    /// Stop after quoting, leaving the unit unsold
    #[arg(long)]
    pub(crate) skip_booking: bool,
}

pub(crate) fn run_cost_sheet(args: CostSheetArgs) -> Result<(), AppError> {
    let engine = QuoteEngine::new(PricingConfig::standard());
    let unit = Unit {
        id: UnitId("preview".to_string()),
        project: "Preview".to_string(),
        tower: "-".to_string(),
        floor: args.floor,
        area: args.area,
        unit_type: "-".to_string(),
        status: UnitStatus::Available,
        blocked_by: None,
        blocked_at: None,
        version: 1,
    };
    let discount = DiscountInput {
        per_area: args.discount_per_area,
        include_parking: args.include_parking,
    };

    let sheet = engine
        .compute_cost_sheet(&unit, discount)
        .map_err(salesdesk::pipeline::PipelineError::from)?;

    println!(
        "Cost sheet for area {} on floor {}",
        args.area, args.floor
    );
    render_cost_sheet(&sheet);
    if engine.needs_approval(args.discount_per_area) {
        println!("Note: this discount requires sales-head approval before booking.");
    }
    Ok(())
}

fn render_cost_sheet(sheet: &CostSheet) {
    println!("- Base cost:     {:>12}", sheet.base_cost);
    println!("- Floor rise:    {:>12}", sheet.floor_rise);
    println!("- Amenities:     {:>12}", sheet.amenities);
    println!("- Parking:       {:>12}", sheet.parking);
    println!("- Gross:         {:>12}", sheet.gross);
    println!("- GST:           {:>12}", sheet.taxes);
    println!("- Stamp duty:    {:>12}", sheet.stamp_duty);
    println!("- Registration:  {:>12}", sheet.registration);
    println!("- Total:         {:>12}", sheet.total);
    println!("- Discount:      {:>12}", sheet.discount);
    println!("- Final price:   {:>12}", sheet.final_price);
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let leads = Arc::new(InMemoryLeadRepository::default());
    let agents = Arc::new(InMemoryAgentRepository::default());
    let units = Arc::new(InMemoryUnitRepository::default());
    let bookings = Arc::new(InMemoryBookingRepository::default());
    seed_agents(&agents).map_err(salesdesk::pipeline::PipelineError::from)?;
    seed_units(&units).map_err(salesdesk::pipeline::PipelineError::from)?;

    let service = PipelineService::new(
        leads,
        agents,
        units,
        bookings,
        Arc::new(LoggingNotifier::default()),
        Arc::new(ProjectSiteGeo::default()),
        PricingConfig::standard(),
        IntakeGuard::default(),
    );

    println!("Lead-to-booking pipeline demo");
    let mut now = Utc::now();

    let lead = service.intake_lead(
        LeadIntake {
            name: "Asha Rao".to_string(),
            mobile: "9876543210".to_string(),
            email: Some("asha@example.com".to_string()),
            source: "Website".to_string(),
            sub_source: Some("organic".to_string()),
            project: "Skyline Heights".to_string(),
        },
        now,
    )?;
    println!(
        "- Lead {} registered, assigned to {}",
        lead.id.0,
        lead.assigned_agent
            .as_ref()
            .map(|agent| agent.0.as_str())
            .unwrap_or("nobody")
    );

    now += Duration::hours(3);
    service.quick_action(&lead.id, QuickAction::Interested, "presales", now)?;
    now += Duration::days(1);
    let scheduled = service.quick_action(&lead.id, QuickAction::Visit, "presales", now)?;
    println!(
        "- Qualified over {} calls, visit scheduled ({})",
        scheduled.call_count,
        scheduled
            .next_follow_up
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "no follow-up".to_string())
    );

    let pass = service.issue_gate_pass(&lead.id, now)?;
    println!("- Gate pass {} issued", pass.token);

    now += Duration::hours(20);
    let arrival = service.scan_gate_pass(&pass.token, now)?;
    match &arrival.handover {
        Some(summary) => println!(
            "- Checked in via gate pass; hand-over {} -> {}",
            summary
                .from
                .as_ref()
                .map(|agent| agent.0.as_str())
                .unwrap_or("unassigned"),
            summary
                .to
                .as_ref()
                .map(|agent| agent.0.as_str())
                .unwrap_or("unassigned"),
        ),
        None => println!("- Checked in via gate pass; already with sales"),
    }

    service.advance_visit(&arrival.lead.id, &arrival.visit_id, VisitStatus::InMeeting)?;
    service.advance_visit(&arrival.lead.id, &arrival.visit_id, VisitStatus::Completed)?;
    println!("- Site visit completed");

    let unit_id = UnitId("A-1201".to_string());
    let quote = service.generate_quote(
        &lead.id,
        &unit_id,
        DiscountInput {
            per_area: args.discount_per_area,
            include_parking: true,
        },
        PaymentPlan::ConstructionLinked,
        now,
    )?;
    println!(
        "- Quote {} v{} on unit {} ({})",
        quote.id.0,
        quote.version,
        unit_id.0,
        quote.status.label()
    );
    render_cost_sheet(&quote.cost_sheet);

    if quote.status == QuoteStatus::PendingApproval {
        service.approve_quote(&lead.id, &quote.id, now)?;
        println!("- Discount above threshold; sales head approved the quote");
    }

    if args.skip_booking {
        println!("- Skipping booking; unit {} remains available", unit_id.0);
        return Ok(());
    }

    now += Duration::days(1);
    let outcome = service.finalize_booking(&lead.id, &quote.id, now)?;
    println!(
        "- Booking {} committed at {} (agreement value {})",
        outcome.booking.id.0, outcome.booking.total_cost, outcome.booking.agreement_value
    );
    for warning in &outcome.warnings {
        println!("  warning: {warning}");
    }

    println!("- Payment schedule:");
    for milestone in &outcome.booking.schedule {
        println!(
            "    {:<22} {:>12} due {} [{}]",
            milestone.name,
            milestone.amount,
            milestone.due_on.date_naive(),
            milestone_display_status(milestone, now).label()
        );
    }

    let unit = service.get_unit(&unit_id)?;
    println!("- Unit {} is now {}", unit.id.0, unit.status.label());

    // A second attempt on the same unit demonstrates the double-sale guard.
    let rival = service.intake_lead(
        LeadIntake {
            name: "Vikram Shah".to_string(),
            mobile: "9123456780".to_string(),
            email: None,
            source: "Walk-in".to_string(),
            sub_source: None,
            project: "Skyline Heights".to_string(),
        },
        now,
    )?;
    let rival_quote = service.generate_quote(
        &rival.id,
        &unit_id,
        DiscountInput {
            per_area: 0,
            include_parking: true,
        },
        PaymentPlan::DownPayment,
        now,
    );
    match rival_quote {
        Ok(rival_quote) => match service.finalize_booking(&rival.id, &rival_quote.id, now) {
            Ok(_) => println!("- Unexpected: rival booking succeeded"),
            Err(err) => println!("- Rival booking rejected as expected: {err}"),
        },
        Err(err) => println!("- Rival quote rejected: {err}"),
    }

    Ok(())
}
