//! Replays queued host-map changes.

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::{Context, util};

pub async fn handle(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let queued = ctx.service.pending_host_maps().await.len();
    let report = ctx.service.reconcile_host_maps().await?;
    if queued > 0 {
        ctx.save().await?;
    }

    let out = output::render_single(
        global.output,
        &report,
        |r| {
            if queued == 0 {
                "Nothing to reconcile.".into()
            } else {
                format!(
                    "Replayed {} of {queued} host-map change(s); {} still pending.",
                    r.replayed,
                    r.still_failing.len()
                )
            }
        },
        |r| r.replayed.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    util::report_host_map_failures(&report.still_failing, ctx.painter, global.quiet);
    Ok(())
}
