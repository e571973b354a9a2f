use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use gi_tweaks::config::{CliArgs, RunConfig};
use gi_tweaks::pipeline::{Pipeline, RunSummary};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let filter = if args.verbose {
        EnvFilter::new("gi_tweaks=debug")
    } else {
        EnvFilter::new("gi_tweaks=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config: RunConfig = args.into();

    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure rayon thread pool")?;
    }

    match Pipeline::run(&config) {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            error!(%e, "Run failed");
            Err(anyhow::anyhow!(e)).context("gi-tweaks run failed")
        }
    }
}

fn print_summary(summary: &RunSummary) {
    if summary.probe_lit > 0 {
        println!("Probe-lit: {} surfaces", summary.probe_lit);
    }

    if summary.shared_lod_changes > 0 {
        println!("Shared LODs: {} placements updated", summary.shared_lod_changes);
    }

    if let Some(repack) = &summary.repack {
        println!("=== Repack ===");
        println!(
            "  Atlases:  {} -> {}",
            repack.old_atlas_count, repack.new_atlas_count
        );
        println!(
            "  Coverage: {:.1}% -> {:.1}%",
            repack.old_coverage_percent, repack.new_coverage_percent
        );
    }

    if let Some(coverage) = &summary.coverage {
        println!("=== Coverage ===");
        for atlas in &coverage.atlases {
            println!(
                "  Lightmap-{}: {}x{}, {} charts, {:.1}%",
                atlas.index,
                atlas.width,
                atlas.height,
                atlas.charts,
                atlas.coverage() * 100.0
            );
        }
        println!("  Total:      {:.1}%", coverage.total_coverage() * 100.0);
    }

    if !summary.seam_fixes.is_empty() {
        println!("=== Seam fixes ===");
        for report in &summary.seam_fixes {
            match report.skipped {
                Some(reason) => println!("  {} / {}: skipped ({reason:?})", report.surface, report.partner),
                None => println!(
                    "  {} / {}: {} pairs, {} texels, error {:.4} -> {:.4}",
                    report.surface,
                    report.partner,
                    report.sample_pairs,
                    report.pixels,
                    report.error_before,
                    report.error_after
                ),
            }
        }
    }

    println!("Done in {:.2}s", summary.duration.as_secs_f64());
}
