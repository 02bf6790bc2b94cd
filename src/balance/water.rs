//! Water balance: Precip + Runoff + Evap + Stor should close to zero.
//!
//! Fluxes follow the ALMA sign convention (water leaving the surface is
//! negative) and are converted to mm day-1. Stor is minus the change of the
//! water stored in snow, soil, canopy and surface reservoirs over the year.

use super::{global_mean_line, BalanceContext, BalanceEvaluator, BalanceOutcome};
use crate::error::QcResult;
use crate::grid::GridField;
use crate::naming::Variable;
use crate::report::DiagnosticReport;
use crate::store::DatasetStore;
use crate::time::SECONDS_PER_DAY;

const UNITS: &str = "mm/day";

/// Reservoirs whose change over the year makes up the storage term
pub const RESERVOIRS: [Variable; 4] = [
    Variable::Swe,
    Variable::SoilMoist,
    Variable::CanopInt,
    Variable::SurfStor,
];

pub const EVAP_COMPONENTS: [Variable; 4] = [
    Variable::ECanop,
    Variable::TVeg,
    Variable::ESoil,
    Variable::EWater,
];

pub const RUNOFF_COMPONENTS: [Variable; 3] = [Variable::Qs, Variable::Qsb, Variable::Qrec];

#[derive(Debug, Clone, Copy, Default)]
pub struct WaterBalance;

impl BalanceEvaluator for WaterBalance {
    fn label(&self) -> &'static str {
        "WB"
    }

    fn evaluate<S: DatasetStore>(
        &self,
        ctx: &BalanceContext<'_, S>,
        year: i32,
        report: &mut DiagnosticReport,
    ) -> QcResult<BalanceOutcome> {
        let tag = format!("{} {}", self.label(), year);
        let per_day = SECONDS_PER_DAY as f64;
        let flux = |variable: Variable, report: &mut DiagnosticReport| {
            ctx.monthly_mean(variable, year, report, &tag).scaled(per_day)
        };

        let precip = flux(Variable::Precip, report);
        let runoff = flux(Variable::Runoff, report);
        let evap = flux(Variable::Evap, report);
        let rainf = flux(Variable::Rainf, report);
        let qsm = flux(Variable::Qsm, report);

        let mut stor = ctx.zero();
        for reservoir in RESERVOIRS {
            stor = stor.add(&ctx.storage_change(reservoir, year, report, &tag))?;
        }

        let net = net_residual(&precip, &runoff, &evap, &stor)?;

        let mut outcome = BalanceOutcome::default();
        for (name, field) in [
            ("Precip", precip),
            ("Runoff", runoff.clone()),
            ("Evap", evap.clone()),
            ("Rainf", rainf),
            ("Qsm", qsm),
            ("Stor", stor),
            ("NET", net.clone()),
        ] {
            outcome.components.push(ctx.component(name, field)?);
        }

        let tolerance = ctx.daily_tolerance();
        let stats = ctx.aggregator.field_stats(&net, tolerance)?;
        report.data(format!(
            "{} variable NET with gpmin {:e}, gpmax {:e} fldmean {:e} #gp>thr {}",
            tag, stats.min, stats.max, stats.abs_mean, stats.exceed_count
        ));
        if stats.abs_mean > tolerance || stats.max_abs() > tolerance {
            report.warning(format!(
                "{} NET residual above {:e} kg m-2 s-1 (min {:e}, max {:e}, mean |NET| {:e} {}, {} grid points over threshold), check water balance closure",
                tag,
                ctx.residual_tolerance,
                stats.min,
                stats.max,
                stats.abs_mean,
                UNITS,
                stats.exceed_count
            ));
        }
        outcome.residual = Some(stats);

        let precip_ref = outcome.components[0].clone();
        for c in &outcome.components {
            report.data(global_mean_line(&tag, c, UNITS, &precip_ref));
        }

        let evap_total = ctx.component("Evap", evap.clone())?;
        let mut breakdown = vec![evap_total.clone()];
        let mut explained = ctx.zero();
        for variable in EVAP_COMPONENTS {
            let field = flux(variable, report);
            explained = explained.add(&field)?;
            breakdown.push(ctx.component(variable.as_str(), field)?);
        }
        breakdown.push(ctx.component("SubSnow", evap.sub(&explained)?)?);
        for c in &breakdown {
            report.data(global_mean_line(&tag, c, UNITS, &evap_total));
        }

        let runoff_total = ctx.component("Runoff", runoff)?;
        let mut breakdown = vec![runoff_total.clone()];
        for variable in RUNOFF_COMPONENTS {
            let field = flux(variable, report);
            breakdown.push(ctx.component(variable.as_str(), field)?);
        }
        for c in &breakdown {
            report.data(global_mean_line(&tag, c, UNITS, &runoff_total));
        }

        Ok(outcome)
    }
}

/// NET = Precip + Runoff + Evap + Stor, cell by cell
pub fn net_residual(
    precip: &GridField,
    runoff: &GridField,
    evap: &GridField,
    stor: &GridField,
) -> QcResult<GridField> {
    precip.add(runoff)?.add(evap)?.add(stor)
}
