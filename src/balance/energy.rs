//! Surface energy balance from monthly means, in W m-2.

use super::{global_mean_line, BalanceContext, BalanceEvaluator, BalanceOutcome, LATENT_HEAT_FUSION};
use crate::error::QcResult;
use crate::naming::Variable;
use crate::report::DiagnosticReport;
use crate::store::DatasetStore;

const UNITS: &str = "W m-2";

/// Terms summed into NET
pub const NET_TERMS: [Variable; 4] = [Variable::SWnet, Variable::LWnet, Variable::Qh, Variable::Qle];

#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyBalance;

impl BalanceEvaluator for EnergyBalance {
    fn label(&self) -> &'static str {
        "EB"
    }

    fn evaluate<S: DatasetStore>(
        &self,
        ctx: &BalanceContext<'_, S>,
        year: i32,
        report: &mut DiagnosticReport,
    ) -> QcResult<BalanceOutcome> {
        let tag = format!("{} {}", self.label(), year);
        let mut outcome = BalanceOutcome::default();

        let mut net = ctx.zero();
        for variable in NET_TERMS {
            let field = ctx.monthly_mean(variable, year, report, &tag);
            net = net.add(&field)?;
            outcome.components.push(ctx.component(variable.as_str(), field)?);
        }

        let melt = ctx
            .monthly_mean(Variable::Qsm, year, report, &tag)
            .scaled(-LATENT_HEAT_FUSION);
        outcome.components.push(ctx.component("SnowmeltHeat", melt)?);
        outcome.components.push(ctx.component("NET", net)?);

        let shortwave = outcome.components[0].clone();
        for c in &outcome.components {
            report.data(global_mean_line(&tag, c, UNITS, &shortwave));
        }
        Ok(outcome)
    }
}
