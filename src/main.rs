//! Succession Engine CLI
//!
//! Runs a sample succession and prints the full breakdown

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use succession_engine::input::{
    Asset, AssetOrigin, Heir, MatrimonialRegime, OwnershipMode, Relationship, SpouseChoice, Wishes,
};
use succession_engine::{simulate, LegalParameters, SimulationInput};

fn main() {
    env_logger::init();

    println!("Succession Engine v0.1.0");
    println!("========================\n");

    // Sample estate: legal community, one community home, surviving
    // spouse and two children, spouse opting for a quarter in ownership
    let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
    let mut home = Asset::new("residence", dec!(600000), OwnershipMode::Full, AssetOrigin::Community);
    home.acquisition_date = Some(date(1995, 5, 10));

    let input = SimulationInput {
        matrimonial_regime: MatrimonialRegime::CommunityLegal,
        marriage_date: Some(date(1990, 6, 1)),
        death_date: date(2024, 3, 1),
        assets: vec![home],
        heirs: vec![
            Heir::new("conjoint", date(1958, 2, 1), Relationship::Spouse),
            Heir::new("enfant-1", date(1991, 4, 1), Relationship::Child),
            Heir::new("enfant-2", date(1994, 9, 1), Relationship::Child),
        ],
        wishes: Wishes {
            spouse_choice: Some(SpouseChoice::QuarterOwnership),
            ..Default::default()
        },
        donations: vec![],
        debts: vec![],
        matrimonial_advantages: None,
        residence_country: "FR".into(),
    };

    let params = LegalParameters::france_2024();
    let output = match simulate(&input, &params) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("simulation failed: {err}");
            std::process::exit(1);
        }
    };

    println!("Estate");
    println!("  Net mass:          {:>12} EUR", output.global_metrics.total_estate_value);
    println!("  Legal reserve:     {:>12} EUR", output.global_metrics.legal_reserve_value);
    println!("  Disposable quota:  {:>12} EUR", output.global_metrics.disposable_quota_value);
    println!("  Total tax:         {:>12} EUR", output.global_metrics.total_tax_amount);
    println!();

    println!(
        "{:<12} {:>8} {:>14} {:>14} {:>12} {:>14}",
        "Heir", "Share%", "Gross", "Taxable", "Tax", "Net"
    );
    println!("{}", "-".repeat(78));
    for heir in &output.heirs_breakdown {
        println!(
            "{:<12} {:>8.2} {:>14} {:>14} {:>12} {:>14}",
            heir.name,
            heir.legal_share_percent,
            heir.gross_share_value,
            heir.taxable_base,
            heir.tax_amount,
            heir.net_share_value,
        );
    }
    println!();

    println!("Calculation steps:");
    for step in &output.calculation_steps {
        println!("  {}. {} - {}", step.step_number, step.step_name, step.result_summary);
    }

    if !output.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &output.warnings {
            println!("  [{:?}/{:?}] {}", warning.severity, warning.category, warning.message);
        }
    }
}
