//! Custom assertion helpers for common test patterns.

use serde_json::Value;

/// Assert that two strings are equal, with a line diff on failure.
pub fn assert_strings_equal(actual: &str, expected: &str) {
    if actual != expected {
        let diff = similar::TextDiff::from_lines(expected, actual);
        let mut output = String::new();

        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                similar::ChangeTag::Delete => "-",
                similar::ChangeTag::Insert => "+",
                similar::ChangeTag::Equal => " ",
            };
            output.push_str(&format!("{}{}", sign, change));
        }

        panic!("Strings are not equal.\nDiff:\n{}", output);
    }
}

/// Assert that an API response is a success and return it.
pub fn assert_success(response: &Value) -> &Value {
    assert_eq!(
        response["status"], "success",
        "Expected success response, got: {response}"
    );
    response
}

/// Assert that an API response is an error with the given code, and return
/// its message.
pub fn assert_api_error(response: &Value, code: u16) -> &str {
    assert_eq!(
        response["status"], "error",
        "Expected error response, got: {response}"
    );
    assert_eq!(
        response["code"].as_u64(),
        Some(u64::from(code)),
        "Unexpected error code in: {response}"
    );
    response["message"]
        .as_str()
        .unwrap_or_else(|| panic!("Error response without message: {response}"))
}

/// Assert that a result is Ok and extract the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Assert that a result is Err.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
    ($expr:expr, $msg:literal) => {
        match $expr {
            Ok(value) => panic!("{}: {:?}", $msg, value),
            Err(e) => e,
        }
    };
}

/// Assert that an option is Some and extract the value.
#[macro_export]
macro_rules! assert_some {
    ($expr:expr) => {
        match $expr {
            Some(value) => value,
            None => panic!("Expected Some, got None"),
        }
    };
}

/// Assert that an option is None.
#[macro_export]
macro_rules! assert_none {
    ($expr:expr) => {
        if let Some(value) = $expr {
            panic!("Expected None, got Some: {:?}", value);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_equal_passes() {
        assert_strings_equal("a\nb", "a\nb");
    }

    #[test]
    #[should_panic(expected = "Strings are not equal")]
    fn strings_equal_reports_diff() {
        assert_strings_equal("a\nb", "a\nc");
    }

    #[test]
    fn api_helpers() {
        let ok = json!({"status": "success", "version_id": 3});
        assert_eq!(assert_success(&ok)["version_id"], 3);

        let err = json!({"status": "error", "message": "Invalid action", "code": 400});
        assert_eq!(assert_api_error(&err, 400), "Invalid action");
    }

    #[test]
    fn result_macros() {
        let ok: Result<i32, String> = Ok(2);
        assert_eq!(assert_ok!(ok), 2);
        let err: Result<i32, String> = Err("boom".to_string());
        assert_eq!(assert_err!(err), "boom");
        assert_eq!(assert_some!(Some(1)), 1);
        assert_none!(None::<i32>);
    }
}
