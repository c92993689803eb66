use crate::infra::{build_core, seed_standard_ward, FlowService};
use clap::Args;
use patient_flow::error::AppError;
use patient_flow::flows::admissions::{
    admissions_per_day, availability_summary, average_stay, open_assignments_by_bed_type,
    AdmissionServiceError, AdmissionStore, BedStore, PatientId, Severity, SnapshotObservations,
    StaffId, TriageOutcome, VitalSigns,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the dashboard projection section of the demo output.
    #[arg(long)]
    pub(crate) skip_dashboard: bool,
}

/// Scripted ward walkthrough: triage-driven intake, a transfer, ICU
/// exhaustion, discharge, and a deceased record, printed step by step.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let (service, store) = build_core();
    let (icu, intermediate, _) = seed_standard_ward(&service).map_err(io_error)?;
    let triage_nurse = StaffId::new();
    let ward_clerk = StaffId::new();

    println!("== Ward setup ==");
    for bed_type in store.list_bed_types().map_err(io_error)? {
        println!(
            "  {:<22} total={} severity_match={}",
            bed_type.name,
            bed_type.total,
            bed_type
                .severity_match
                .map(Severity::label)
                .unwrap_or("none"),
        );
    }

    println!("\n== Triage intake ==");
    let critical = triage(&service, Severity::Red, triage_nurse)?;
    triage(&service, Severity::Yellow, triage_nurse)?;
    triage(&service, Severity::White, triage_nurse)?;

    // Red always admits; bail out quietly if the ward setup changed.
    let Some(critical) = critical else {
        return Ok(());
    };

    println!("\n== ICU exhaustion ==");
    let second = service
        .admit(PatientId::new(), ward_clerk)
        .map_err(io_error)?;
    service
        .assign_bed(second.id, icu.id, ward_clerk)
        .map_err(io_error)?;
    println!("  second ICU bed assigned to {}", second.barcode);

    let third = service
        .admit(PatientId::new(), ward_clerk)
        .map_err(io_error)?;
    match service.assign_bed(third.id, icu.id, ward_clerk) {
        Err(AdmissionServiceError::BedUnavailable { bed_type_name }) => {
            println!("  third request rejected: no {bed_type_name} bed free");
        }
        Ok(_) => println!("  unexpected: a third ICU bed was granted"),
        Err(err) => return Err(io_error(err)),
    }

    println!("\n== Transfer and release ==");
    let transferred = service
        .assign_bed(critical.id, intermediate.id, ward_clerk)
        .map_err(io_error)?;
    println!(
        "  {} stepped down to {}",
        critical.barcode,
        transferred.id
    );
    service
        .discharge(second.id, Some("recovered".to_string()), ward_clerk)
        .map_err(io_error)?;
    println!("  {} discharged, bed sent to cleaning", second.barcode);
    service
        .record_deceased(
            third.id,
            "multiple organ failure".to_string(),
            None,
            ward_clerk,
        )
        .map_err(io_error)?;
    println!("  {} deceased recorded", third.barcode);

    if !args.skip_dashboard {
        println!("\n== Dashboard projections ==");
        let snapshot = store.snapshot_ledger().map_err(io_error)?;
        let bed_types = store.list_bed_types().map_err(io_error)?;
        let beds = store.snapshot_beds().map_err(io_error)?;

        let summary = availability_summary(&snapshot, &bed_types, &beds);
        for ratio in &summary.bed_availability {
            println!("  {:<22} {:>5.0}% free", ratio.label, ratio.value * 100.0);
        }
        println!(
            "  global availability {:.0}%, discharges {}",
            summary.global_availability * 100.0,
            summary.total_discharges
        );

        for count in open_assignments_by_bed_type(&snapshot, &bed_types, &beds) {
            println!("  open assignments / {:<18} {}", count.label, count.value);
        }
        if let Some(stay) = average_stay(&snapshot) {
            println!("  average stay {} minutes", stay.num_minutes());
        }
        for day in admissions_per_day(&snapshot) {
            let buckets: Vec<String> = day
                .counts
                .iter()
                .map(|count| format!("{}={}", count.label, count.value))
                .collect();
            println!("  {}: {}", day.date, buckets.join(", "));
        }
    }

    Ok(())
}

fn triage(
    service: &FlowService,
    severity: Severity,
    nurse: StaffId,
) -> Result<Option<patient_flow::flows::admissions::Admission>, AppError> {
    let outcome = service
        .admit_from_triage(
            PatientId::new(),
            SnapshotObservations {
                severity,
                vitals: VitalSigns::default(),
                observations: None,
            },
            nurse,
        )
        .map_err(io_error)?;

    match outcome {
        TriageOutcome::NotAdmitted => {
            println!("  {} triage: sent home, no admission", severity.label());
            Ok(None)
        }
        TriageOutcome::Admitted {
            admission,
            snapshot,
        } => {
            match &snapshot.assigned_bed {
                Some(bed) => println!(
                    "  {} triage: admitted {} into bed {}",
                    severity.label(),
                    admission.barcode,
                    bed.id
                ),
                None => println!(
                    "  {} triage: admitted {} with no free bed",
                    severity.label(),
                    admission.barcode
                ),
            }
            Ok(Some(admission))
        }
    }
}

fn io_error(err: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
}
