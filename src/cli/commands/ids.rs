//! Ids command implementation
//!
//! This module implements the `ids` command for checking national identity
//! numbers against their check digits, or generating valid ones.

use crate::anonymization::allocator::ChecksumIdentityGenerator;
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Arguments for the ids command
#[derive(Args, Debug)]
pub struct IdsArgs {
    /// Identifiers to validate
    pub values: Vec<String>,

    /// Generate this many valid identifiers instead
    #[arg(short, long, conflicts_with = "values")]
    pub generate: Option<usize>,

    /// Seed for reproducible generation
    #[arg(long, requires = "generate")]
    pub seed: Option<u64>,
}

impl IdsArgs {
    /// Execute the ids command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        let generator = ChecksumIdentityGenerator::new();

        if let Some(count) = self.generate {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            for id in generate_ids(&generator, &mut rng, count) {
                println!("{id}");
            }
            return Ok(0);
        }

        if self.values.is_empty() {
            eprintln!("Nothing to do: pass identifiers to validate or --generate <N>");
            return Ok(2);
        }

        let mut invalid = 0usize;
        for value in &self.values {
            if generator.validate(value.trim()) {
                println!("✅ {value}");
            } else {
                invalid += 1;
                println!("❌ {value}");
            }
        }
        tracing::info!(checked = self.values.len(), invalid, "Identifiers validated");

        Ok(if invalid == 0 { 0 } else { 1 })
    }
}

fn generate_ids(
    generator: &ChecksumIdentityGenerator,
    rng: &mut StdRng,
    count: usize,
) -> Vec<String> {
    (0..count).map(|_| generator.generate(rng)).collect()
}
