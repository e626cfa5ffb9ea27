//! Response predicates for the business abilities query.
use serde_json::Value;
use volley::check::Checks;
use volley::http::Response;

pub const STATUS_IS_200: &str = "status is 200";
pub const HAS_DATA: &str = "response has data";
pub const ABILITIES_EXIST: &str = "business.abilities exists";
pub const MANAGE_IS_BOOLEAN: &str = "manage is boolean";
pub const NO_ERRORS: &str = "no errors in response";

/// Evaluate every predicate against `response`.
///
/// The body is parsed once; if it is not JSON every body predicate fails. A key holding JSON
/// `null` counts as present. Numbers outside the `f64` range are kept as written rather than
/// rejecting the body.
pub fn evaluate(response: &Response) -> Checks {
    let body = response.json::<Value>().ok();
    let data = body.as_ref().and_then(|b| b.get("data"));
    let abilities = data
        .and_then(|d| d.get("business"))
        .and_then(|b| b.get("abilities"));
    let manage = abilities.and_then(|a| a.get("manage"));

    Checks::new()
        .check(STATUS_IS_200, response.status == 200)
        .check(HAS_DATA, data.is_some())
        .check(ABILITIES_EXIST, abilities.is_some())
        .check(MANAGE_IS_BOOLEAN, manage.is_some_and(Value::is_boolean))
        .check(NO_ERRORS, body.as_ref().is_some_and(no_errors))
}

// `errors` passes when missing, falsy or an empty list.
fn no_errors(body: &Value) -> bool {
    if body.is_null() {
        return false;
    }

    match body.get("errors") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::Array(errors)) => errors.is_empty(),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.),
        Some(_) => false,
    }
}
