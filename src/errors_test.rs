// Unit tests for errors module

use super::*;

#[test]
fn test_only_session_loss_is_fatal() {
    assert!(ActionError::Session("gone".into()).is_fatal());

    let recoverable = [
        ActionError::ElementNotFound {
            locator: "[data-testid=\"logs-btn\"]".into(),
            waited_ms: 5000,
        },
        ActionError::Timeout("load".into()),
        ActionError::Navigation {
            url: "http://localhost:3000/#/".into(),
            reason: "refused".into(),
        },
        ActionError::Theme {
            expected: "dark".into(),
            observed: "light".into(),
        },
        ActionError::Script("boom".into()),
        ActionError::Screenshot("empty".into()),
        ActionError::io(
            "/tmp/x.jpg",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        ),
    ];
    for err in recoverable {
        assert!(!err.is_fatal(), "{} should be recoverable", err);
    }
}

#[test]
fn test_element_not_found_message() {
    let err = ActionError::ElementNotFound {
        locator: "text~\"Help Center\"".into(),
        waited_ms: 250,
    };
    assert_eq!(
        err.to_string(),
        "element not found: text~\"Help Center\" (waited 250 ms)"
    );
}

#[test]
fn test_wait_timeout_maps_to_timeout() {
    let cmd = fantoccini::error::CmdError::WaitTimeout;
    assert!(matches!(ActionError::from(cmd), ActionError::Timeout(_)));
}

#[test]
fn test_exit_codes() {
    let invalid = CrawlError::InvalidBaseUrl {
        url: "nope".into(),
        reason: "relative URL without a base".into(),
    };
    assert_eq!(invalid.exit_code(), 2);
    assert_eq!(CrawlError::WebDriverFailed("refused".into()).exit_code(), 4);
    assert_eq!(
        CrawlError::Aborted {
            completed: 12,
            reason: "browser session lost".into()
        }
        .exit_code(),
        6
    );
    assert_eq!(CrawlError::Other(anyhow::anyhow!("x")).exit_code(), 1);
}

#[test]
fn test_crawl_error_survives_anyhow_roundtrip() {
    let err: anyhow::Error = CrawlError::WebDriverFailed("refused".into()).into();
    let back = err.downcast::<CrawlError>().unwrap();
    assert_eq!(back.exit_code(), 4);
}

#[test]
fn test_webdriver_codes_are_classified() {
    let lost = ActionError::from_webdriver_code("invalid session id", "session deleted".into());
    assert!(matches!(lost, ActionError::Session(_)));
    assert!(lost.is_fatal());

    assert!(matches!(
        ActionError::from_webdriver_code("no such element", "#missing".into()),
        ActionError::ElementNotFound { ref locator, .. } if locator == "#missing"
    ));
    assert!(matches!(
        ActionError::from_webdriver_code("timeout", "page load".into()),
        ActionError::Timeout(_)
    ));
    assert!(matches!(
        ActionError::from_webdriver_code("script timeout", "slow".into()),
        ActionError::Timeout(_)
    ));

    let other = ActionError::from_webdriver_code("javascript error", "x is undefined".into());
    assert!(matches!(other, ActionError::Script(_)));
    assert!(!other.is_fatal());
}
