use std::sync::Arc;

use finwell_core::{FormattedResponse, ResponseFormatter};
use serde::Serialize;

use crate::cli::PlansArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

#[derive(Debug, Serialize)]
struct PlansResponseData<'a> {
    monthly_income: f64,
    tier: Option<&'a str>,
    plans: Vec<&'a str>,
    response: FormattedResponse,
}

pub fn run(args: &PlansArgs, context: &Context) -> Result<CommandResult, CliError> {
    if !args.income.is_finite() || args.income < 0.0 {
        return Err(CliError::Validation(finwell_core::ValidationError::NegativeValue {
            field: "income",
        }));
    }

    let tier = context.config.plan_tier(args.income);
    let response = ResponseFormatter::new(Arc::clone(&context.config)).insurance_plans(args.income);
    let text = response.text.clone();

    let data = serde_json::to_value(PlansResponseData {
        monthly_income: args.income,
        tier: tier.map(|tier| tier.label.as_str()),
        plans: tier
            .map(|tier| tier.plans.iter().map(String::as_str).collect())
            .unwrap_or_default(),
        response,
    })?;
    Ok(CommandResult::ok(data, text))
}
