use matreq_db::{migrations, DemoSeedDataset, SeedResult, VerificationResult};

use crate::commands::{open_pool, prepare, CommandResult, StepError};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_pool(&config).await?;
        let outcome = async {
            migrations::run_pending(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), 5u8))?;

            let seeded = DemoSeedDataset::load(&pool)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

            let verification = DemoSeedDataset::verify(&pool)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

            check_verification(&verification)?;
            Ok::<SeedResult, StepError>(seeded)
        }
        .await;

        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success(
            "seed",
            format!(
                "demo dataset loaded: {} profiles, {} sessions, {} material requests \
                 (sign in with token `{}`)",
                seeded.profiles,
                seeded.sessions,
                seeded.requests,
                DemoSeedDataset::SITE_LEAD_TOKEN
            ),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn check_verification(verification: &VerificationResult) -> Result<(), StepError> {
    if verification.all_present {
        return Ok(());
    }

    let failed_checks = verification
        .checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();
    let message = if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for: {}", failed_checks.join(", "))
    };
    Err(("seed_verification", message, 6u8))
}
