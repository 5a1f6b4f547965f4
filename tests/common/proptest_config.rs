/// Case count for the property suites; `PROPTEST_CASES` overrides it.
pub fn cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(64)
}
