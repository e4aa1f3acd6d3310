//! Unit tests for matchers, descriptors and structural comparison
#[cfg(test)]
mod tests {
    use jsoncompose::services::matchers::{MatcherDescriptor, matches_expected};
    use jsoncompose::{Error, MatcherRegistry};
    use serde_json::{Map, Value, json};

    fn build(name: &str, args: Value) -> Box<dyn jsoncompose::services::matchers::Matcher> {
        let args = args.as_array().cloned().unwrap_or_default();
        MatcherRegistry::with_builtins()
            .construct(name, &args, &Map::new())
            .unwrap_or_else(|err| panic!("{name}: {err}"))
    }

    #[test]
    fn type_matchers() {
        assert!(build("Anything", json!([])).matches(&json!(null)));
        assert!(build("AnyText", json!([])).matches(&json!("")));
        assert!(!build("AnyText", json!([])).matches(&json!(1)));
        assert!(build("AnyNumber", json!([])).matches(&json!(1.5)));
        assert!(!build("AnyNumber", json!([])).matches(&json!("1")));
        assert!(build("AnyBool", json!([])).matches(&json!(false)));
        assert!(build("AnyDict", json!([])).matches(&json!({})));
        assert!(!build("AnyNonEmptyDict", json!([])).matches(&json!({})));
        assert!(build("AnyNonEmptyDict", json!([])).matches(&json!({"a": 1})));
        assert!(build("AnyList", json!([])).matches(&json!([])));
        assert!(!build("AnyNonEmptyList", json!([])).matches(&json!([])));
        assert!(build("AnyNonEmptyList", json!([])).matches(&json!([0])));
    }

    #[test]
    fn text_like_is_anchored_and_case_insensitive_by_default() {
        let matcher = build("AnyTextLike", json!(["ab+c"]));
        assert!(matcher.matches(&json!("ABBC-suffix")));
        assert!(!matcher.matches(&json!("xabc")));
        assert_eq!(matcher.describe(), "<Any Text Like \"ab+c\", case insensitive>");

        let sensitive = build("AnyTextLike", json!(["abc", true]));
        assert!(!sensitive.matches(&json!("ABC")));
        assert_eq!(
            sensitive.explain_mismatch(&json!("ABC")).as_deref(),
            Some("\"ABC\" doesn't match case sensitive pattern \"abc\"")
        );
        assert_eq!(
            sensitive.explain_mismatch(&json!(1)).as_deref(),
            Some("type number doesn't match expected text")
        );
    }

    #[test]
    fn text_like_rejects_bad_pattern() {
        let err = MatcherRegistry::with_builtins()
            .construct("AnyTextLike", &[json!("(")], &Map::new())
            .expect_err("bad regex");
        assert!(matches!(err, Error::Matcher { .. }));
        assert!(err.to_string().contains("invalid pattern"), "{err}");
    }

    #[test]
    fn text_with_substring() {
        let matcher = build("AnyTextWith", json!(["Needle"]));
        assert!(matcher.matches(&json!("haystack with a needle")));
        assert!(!build("AnyTextWith", json!(["Needle", true])).matches(&json!("needle")));
    }

    #[test]
    fn number_bounds_and_ranges() {
        assert!(build("AnyNumberGreaterThan", json!([5])).matches(&json!(5.5)));
        assert!(!build("AnyNumberGreaterThan", json!([5])).matches(&json!(5)));
        assert!(build("AnyNumberLessThan", json!([5])).matches(&json!(-1)));

        let range = build("AnyNumberInRange", json!([1, 3]));
        assert!(range.matches(&json!(1)));
        assert!(range.matches(&json!(3)));
        assert!(!range.matches(&json!(3.5)));
        assert_eq!(
            range.explain_mismatch(&json!(4)).as_deref(),
            Some("4 is greater than 3 (right limit)")
        );
        assert_eq!(
            range.explain_mismatch(&json!(0)).as_deref(),
            Some("0 is less than 1 (left limit)")
        );
        assert_eq!(range.explain_mismatch(&json!(2)), None);

        let err = MatcherRegistry::with_builtins()
            .construct("AnyNumberInRange", &[json!(3), json!(1)], &Map::new())
            .expect_err("inverted range");
        assert!(err.to_string().contains("invalid range limits"), "{err}");
    }

    #[test]
    fn list_size_and_item_type() {
        let exactly = build("AnyListOf", json!([2, "example"]));
        assert!(exactly.matches(&json!(["a", "b"])));
        assert!(!exactly.matches(&json!(["a", 1])));
        assert!(!exactly.matches(&json!(["a"])));
        assert_eq!(exactly.describe(), "<Any List Of 2 item(s) of type \"text\">");

        let any_size = build("AnyListOf", json!([]));
        assert!(any_size.matches(&json!([1, "mixed"])));

        assert!(build("AnyListLongerThan", json!([1])).matches(&json!([1, 2])));
        assert!(!build("AnyListShorterThan", json!([1])).matches(&json!([1])));
        assert!(
            MatcherRegistry::with_builtins()
                .construct("AnyListLongerThan", &[], &Map::new())
                .is_err()
        );

        let range = build("AnyListOfRange", json!([1, 2, 0]));
        assert!(range.matches(&json!([1])));
        assert!(range.matches(&json!([1, 2])));
        assert!(!range.matches(&json!([])));
        assert!(!range.matches(&json!([1, "x"])));
        assert!(
            MatcherRegistry::with_builtins()
                .construct("AnyListOfRange", &[json!(2), json!(2)], &Map::new())
                .is_err()
        );
    }

    #[test]
    fn keyword_arguments_bind_by_name() {
        let mut kwargs = Map::new();
        kwargs.insert("min_number".to_string(), json!(0));
        kwargs.insert("max_number".to_string(), json!(10));
        let matcher = MatcherRegistry::with_builtins()
            .construct("AnyNumberInRange", &[], &kwargs)
            .expect("keywords");
        assert!(matcher.matches(&json!(10)));
    }

    #[test]
    fn unknown_matcher_and_duplicates() {
        let mut registry = MatcherRegistry::with_builtins();
        let err = registry.construct("AnyColor", &[], &Map::new()).expect_err("unknown");
        assert!(err.to_string().contains("not registered"));

        let err = registry
            .register("AnyText", |_: &[Value], _: &Map<String, Value>| {
                Err(Error::InvalidInput("unused".to_string()))
            })
            .expect_err("duplicate");
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn descriptor_round_trip_through_registry() {
        let descriptor = MatcherDescriptor {
            name: "AnyNumberGreaterThan".to_string(),
            args: vec![json!(10)],
            kwargs: Map::new(),
        };
        let value = descriptor.to_value().expect("to value");
        assert_eq!(value, json!({"$matcher": "AnyNumberGreaterThan", "$args": [10]}));

        let registry = MatcherRegistry::with_builtins();
        let matcher = registry
            .from_descriptor(&value)
            .expect("valid")
            .expect("is a descriptor");
        assert!(matcher.matches(&json!(11)));

        assert!(registry.from_descriptor(&json!({"plain": 1})).expect("valid").is_none());
        assert!(registry.from_descriptor(&json!({"$matcher": 5})).is_err());
    }

    #[test]
    fn matches_expected_compares_structurally() {
        let registry = MatcherRegistry::with_builtins();
        let expected = json!({
            "id": {"$matcher": "AnyText"},
            "tags": [{"$matcher": "AnyNonEmptyList"}, 2],
            "price": {"$matcher": "AnyNumberInRange", "min_number": 1, "max_number": 100}
        });

        let good = json!({"id": "x1", "tags": [[1], 2], "price": 50});
        assert!(matches_expected(&expected, &good, &registry).expect("compare"));

        let wrong_price = json!({"id": "x1", "tags": [[1], 2], "price": 500});
        assert!(!matches_expected(&expected, &wrong_price, &registry).expect("compare"));

        let extra_key = json!({"id": "x1", "tags": [[1], 2], "price": 50, "more": 1});
        assert!(!matches_expected(&expected, &extra_key, &registry).expect("compare"));

        let short = json!({"id": "x1", "tags": [[1]], "price": 50});
        assert!(!matches_expected(&expected, &short, &registry).expect("compare"));
    }

    #[test]
    fn any_date_accepts_iso_text() {
        let matcher = build("AnyDate", json!([]));
        for text in [
            "2024-02-29",
            "2024-02-29T10:15:00",
            "2024-02-29 10:15:00",
            "2024-02-29T10:15:00Z",
            "2024-02-29T10:15:00.123+02:00",
        ] {
            assert!(matcher.matches(&json!(text)), "{text}");
        }
        assert!(!matcher.matches(&json!("2023-02-29")));
        assert!(!matcher.matches(&json!("yesterday")));
        assert!(!matcher.matches(&json!(20240229)));
        assert_eq!(matcher.describe(), "<Any Date>");
        assert!(
            matcher
                .explain_mismatch(&json!(1))
                .is_some_and(|reason| reason.contains("only ISO 8601"))
        );
    }

    #[test]
    fn date_before_and_after_fixed_limit() {
        let before = build("AnyDateBefore", json!(["2024-01-01T00:00:00Z"]));
        assert!(before.matches(&json!("2023-12-31T23:59:59Z")));
        assert!(!before.matches(&json!("2024-01-01T00:00:00Z")));
        // 23:00 UTC on the previous day
        assert!(before.matches(&json!("2024-01-01T01:00:00+02:00")));
        assert!(!before.matches(&json!("not a date")));
        assert_eq!(before.describe(), "<Any Date Before 2024-01-01T00:00:00+00:00>");
        let reason = before
            .explain_mismatch(&json!("2024-01-02T00:00:00Z"))
            .expect("mismatch");
        assert!(
            reason.starts_with("2024-01-02T00:00:00+00:00 is ")
                && reason.ends_with(" later than 2024-01-01T00:00:00+00:00"),
            "{reason}"
        );

        let after = build("AnyDateAfter", json!(["2024-01-01"]));
        assert!(after.matches(&json!("2024-01-01T00:00:01Z")));
        assert!(!after.matches(&json!("2024-01-01")));
        assert!(
            after
                .explain_mismatch(&json!("2023-12-31"))
                .is_some_and(|reason| reason.contains("earlier than"))
        );
    }

    #[test]
    fn date_limits_relative_to_now() {
        let now = chrono::Utc::now();
        let past = (now - chrono::Duration::days(3)).to_rfc3339();
        let future = (now + chrono::Duration::hours(5)).to_rfc3339();

        let before_now = build("AnyDateBefore", json!([]));
        assert_eq!(before_now.describe(), "<Any Date Before now>");
        assert!(before_now.matches(&json!(past)));
        assert!(!before_now.matches(&json!(future)));

        assert!(build("AnyDateAfter", json!(["-1w"])).matches(&json!(past)));
        assert!(!build("AnyDateAfter", json!(["-2d"])).matches(&json!(past)));
        assert!(build("AnyDateBefore", json!(["+1.5y"])).matches(&json!(future)));
        assert!(!build("AnyDateBefore", json!(["+90m"])).matches(&json!(future)));

        let err = MatcherRegistry::with_builtins()
            .construct("AnyDateAfter", &[json!("soon")], &Map::new())
            .expect_err("bad limit");
        assert!(err.to_string().contains("neither an ISO 8601 date"), "{err}");
    }

    #[test]
    fn date_in_range_is_inclusive() {
        let range = build("AnyDateInRange", json!(["2024-01-01", "2024-12-31T00:00:00Z"]));
        assert!(range.matches(&json!("2024-01-01T00:00:00Z")));
        assert!(range.matches(&json!("2024-06-15")));
        assert!(range.matches(&json!("2024-12-31")));
        assert!(!range.matches(&json!("2024-12-31T00:00:01Z")));
        assert!(
            range
                .explain_mismatch(&json!("2025-01-01"))
                .is_some_and(|reason| reason.ends_with("(right limit)"))
        );
        assert!(
            range
                .explain_mismatch(&json!("2023-06-01"))
                .is_some_and(|reason| reason.ends_with("(left limit)"))
        );
        assert_eq!(range.explain_mismatch(&json!("2024-03-03")), None);

        let around_now = build("AnyDateInRange", json!(["-1h", "+1h"]));
        assert!(around_now.matches(&json!(chrono::Utc::now().to_rfc3339())));
        assert_eq!(around_now.describe(), "<Any Date In Range between -1h and +1h>");

        let err = MatcherRegistry::with_builtins()
            .construct("AnyDateInRange", &[json!("+1d"), json!("now")], &Map::new())
            .expect_err("inverted range");
        assert!(err.to_string().contains("invalid range limits"), "{err}");
    }

    #[test]
    fn list_of_matchers_checks_every_element() {
        let matcher = build("AnyListOfMatchers", json!([{"$matcher": "AnyText"}, 2]));
        assert!(matcher.matches(&json!(["a", "b"])));
        assert!(!matcher.matches(&json!(["a", 1])));
        assert!(!matcher.matches(&json!(["a"])));
        assert!(!matcher.matches(&json!("ab")));
        assert_eq!(
            matcher.describe(),
            "<Any List Of Matchers (<Any Text>) of 2 item(s)>"
        );
        assert_eq!(
            matcher.explain_mismatch(&json!(["a", 1, 2])).as_deref(),
            Some(
                "size 3 doesn't match expected 2 item(s)\n\
                 elements that don't match <Any Text>:\n  \
                 1) 1: 1 != <Any Text>\n  \
                 2) 2: 2 != <Any Text>"
            )
        );
    }

    #[test]
    fn list_of_matchers_with_structured_elements() {
        let matcher = build(
            "AnyListOfMatchers",
            json!([{"id": {"$matcher": "AnyNumber"}, "kind": "user"}]),
        );
        assert!(matcher.matches(&json!([])));
        assert!(matcher.matches(&json!([{"id": 1, "kind": "user"}, {"id": 2.5, "kind": "user"}])));
        assert!(!matcher.matches(&json!([{"id": "1", "kind": "user"}])));
        assert!(!matcher.matches(&json!([{"id": 1}])));
        assert_eq!(
            matcher.describe(),
            "<Any List Of Matchers ({\"id\": <Any Number>, \"kind\": \"user\"}) of any number of item(s)>"
        );
    }

    #[test]
    fn list_of_matchers_size_rules() {
        let longer = build("AnyListOfMatchersLongerThan", json!([1, 1]));
        assert!(longer.matches(&json!([1, 1])));
        assert!(!longer.matches(&json!([1])));
        assert!(!longer.matches(&json!([1, 2])));
        assert_eq!(
            longer.describe(),
            "<Any List Of Matchers (1) of more than 1 item(s)>"
        );

        let shorter = build(
            "AnyListOfMatchersShorterThan",
            json!([{"$matcher": "AnyNumberLessThan", "$args": [10]}, 3]),
        );
        assert!(shorter.matches(&json!([1, 2])));
        assert!(!shorter.matches(&json!([1, 2, 3])));
        assert!(!shorter.matches(&json!([1, 20])));

        let registry = MatcherRegistry::with_builtins();
        let text = json!({"$matcher": "AnyText"});
        assert!(
            registry
                .construct("AnyListOfMatchersShorterThan", &[text], &Map::new())
                .is_err()
        );
        assert!(registry.construct("AnyListOfMatchers", &[], &Map::new()).is_err());
        let err = registry
            .construct("AnyListOfMatchers", &[json!({"$matcher": "Nope"})], &Map::new())
            .expect_err("unknown nested matcher");
        assert!(err.to_string().contains("not registered"), "{err}");
    }

    #[test]
    fn builtin_names_include_dates_and_nested_lists() {
        let registry = MatcherRegistry::with_builtins();
        for name in [
            "AnyDate",
            "AnyDateBefore",
            "AnyDateAfter",
            "AnyDateInRange",
            "AnyListOfMatchers",
            "AnyListOfMatchersLongerThan",
            "AnyListOfMatchersShorterThan",
        ] {
            assert!(registry.contains(name), "{name}");
        }
        assert_eq!(registry.names().len(), 24);
    }
}
