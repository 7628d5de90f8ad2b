use super::*;
use minijinja::{context, value::Value};
use rstest::rstest;
use time::macros::datetime;

const FROZEN: OffsetDateTime = datetime!(2024-01-31 14:05:09 UTC);

fn build_env() -> Environment<'static> {
    let mut env = Environment::new();
    register_functions(&mut env, Clock::Fixed(FROZEN));
    env
}

fn eval_expression(env: &Environment<'_>, expr: &str) -> Value {
    env.compile_expression(expr)
        .expect("compile expression")
        .eval(context! {})
        .expect("evaluate expression")
}

#[rstest]
#[case("date()", "2024-01-31")]
#[case("datetime()", "2024-01-31 14:05:09")]
#[case("now()", "2024-01-31 14:05:09")]
#[case("now('H:i')", "14:05")]
#[case("date('tomorrow')", "2024-02-01")]
#[case("date('yesterday')", "2024-01-30")]
#[case("datetime('today')", "2024-01-31 00:00:00")]
#[case("date('+1 month')", "2024-02-29")]
#[case("date('-1 year')", "2023-01-31")]
#[case("datetime('+2 hours -5 minutes')", "2024-01-31 16:00:09")]
#[case("date('2021-07-04', 'd/m/Y')", "04/07/2021")]
#[case("datetime('2021-07-04T08:09:10')", "2021-07-04 08:09:10")]
#[case("date(format='D, j M y')", "Wed, 31 Jan 24")]
#[case("date(date='tomorrow', format='l F')", "Thursday February")]
#[case("now('g:i A')", "2:05 PM")]
#[case("now('\\\\Y Y')", "Y 2024")]
#[case("now('U')", "1706709909")]
fn helpers_render_frozen_clock(#[case] expr: &str, #[case] expected: &str) {
    let env = build_env();
    assert_eq!(eval_expression(&env, expr).to_string(), expected);
}

#[rstest]
#[case("date('next blue moon')")]
#[case("date('+1 fortnight')")]
#[case("date('+ day')")]
fn invalid_dates_are_rejected(#[case] expr: &str) {
    let env = build_env();
    let err = env
        .compile_expression(expr)
        .expect("compile expression")
        .eval(context! {})
        .expect_err("invalid date should error");
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert!(err.to_string().contains("is invalid"), "{err}");
}

#[rstest]
fn unknown_keyword_arguments_are_rejected() {
    let env = build_env();
    let result = env
        .compile_expression("date(zone='UTC')")
        .expect("compile expression")
        .eval(context! {});
    assert!(result.is_err());
}

#[rstest]
#[case(datetime!(2024-03-31 00:00:00 UTC), -1, datetime!(2024-02-29 00:00:00 UTC))]
#[case(datetime!(2023-12-15 06:00:00 UTC), 1, datetime!(2024-01-15 06:00:00 UTC))]
#[case(datetime!(2024-01-10 00:00:00 UTC), -13, datetime!(2022-12-10 00:00:00 UTC))]
fn add_months_clamps_and_wraps(
    #[case] start: OffsetDateTime,
    #[case] months: i64,
    #[case] expected: OffsetDateTime,
) {
    assert_eq!(add_months(start, months, "test").expect("in range"), expected);
}

#[rstest]
#[case("date('+1 month')", "2024-02-10")]
#[case("date('-1 year')", "2023-01-10")]
#[case("date('+3 months -1 day')", "2024-04-09")]
#[case("date('2024-01-27', 'Y-m-d') ~ ' ' ~ date('+1 month')", "2024-01-27 2024-02-10")]
fn month_arithmetic_keeps_early_days(#[case] expr: &str, #[case] expected: &str) {
    let mut env = Environment::new();
    register_functions(&mut env, Clock::Fixed(datetime!(2024-01-10 09:00:00 UTC)));
    assert_eq!(eval_expression(&env, expr).to_string(), expected);
}

#[rstest]
#[case(datetime!(2024-01-27 00:00:00 UTC), 1, datetime!(2024-02-27 00:00:00 UTC))]
#[case(datetime!(2024-05-01 00:00:00 UTC), -3, datetime!(2024-02-01 00:00:00 UTC))]
#[case(datetime!(2023-01-29 00:00:00 UTC), 1, datetime!(2023-02-28 00:00:00 UTC))]
fn add_months_keeps_or_clamps_the_day(
    #[case] start: OffsetDateTime,
    #[case] months: i64,
    #[case] expected: OffsetDateTime,
) {
    assert_eq!(add_months(start, months, "test").expect("in range"), expected);
}

#[rstest]
fn system_clock_formats_current_year() {
    let mut env = Environment::new();
    register_functions(&mut env, Clock::System);
    let year = eval_expression(&env, "now('Y')").to_string();
    assert_eq!(year, OffsetDateTime::now_utc().year().to_string());
}
