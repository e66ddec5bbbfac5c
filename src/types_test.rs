// Unit tests for types module

use super::*;

#[test]
fn test_viewport_size_parse() {
    // Valid formats
    let size = ViewportSize::parse("1440x900").unwrap();
    assert_eq!(size.width, 1440);
    assert_eq!(size.height, 900);

    let size = ViewportSize::parse("390x844").unwrap();
    assert_eq!(size, MOBILE);

    // Invalid formats
    assert!(ViewportSize::parse("1440").is_err());
    assert!(ViewportSize::parse("1440x").is_err());
    assert!(ViewportSize::parse("x900").is_err());
    assert!(ViewportSize::parse("1440X900").is_err()); // uppercase X
}

#[test]
fn test_mobile_threshold() {
    assert!(ViewportSize::new(768, 1024).is_mobile());
    assert!(!ViewportSize::new(769, 1024).is_mobile());
    assert!(MOBILE.is_mobile());
    assert!(!DESKTOP.is_mobile());
}

#[test]
fn test_theme_from_str() {
    assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
    assert_eq!(" Light ".parse::<Theme>().unwrap(), Theme::Light);
    assert!("sepia".parse::<Theme>().is_err());
    assert_eq!(Theme::Dark.to_string(), "dark");
}

#[test]
fn test_default_breakpoints_order() {
    let names: Vec<String> = default_breakpoints().into_iter().map(|bp| bp.name).collect();
    assert_eq!(
        names,
        vec!["desktop_dark", "desktop_light", "mobile_dark", "mobile_light"]
    );
}

#[test]
fn test_default_breakpoints_cover_each_combination_once() {
    let bps = default_breakpoints();
    for mobile in [false, true] {
        for theme in [Theme::Dark, Theme::Light] {
            let count = bps
                .iter()
                .filter(|bp| bp.is_mobile() == mobile && bp.theme == theme)
                .count();
            assert_eq!(count, 1, "mobile={} theme={}", mobile, theme);
        }
    }
}

#[test]
fn test_breakpoint_display() {
    let bp = Breakpoint::new("mobile_light", MOBILE, Theme::Light);
    assert_eq!(bp.to_string(), "mobile_light (390x844, light)");
}

#[test]
fn test_select_breakpoints_keeps_declared_order() {
    let only = vec!["mobile_light".to_string(), "desktop_dark".to_string()];
    let selected = select_breakpoints(default_breakpoints(), &only).unwrap();
    let names: Vec<&str> = selected.iter().map(|bp| bp.name.as_str()).collect();
    assert_eq!(names, vec!["desktop_dark", "mobile_light"]);
}

#[test]
fn test_select_breakpoints_empty_filter_keeps_all() {
    let selected = select_breakpoints(default_breakpoints(), &[]).unwrap();
    assert_eq!(selected.len(), 4);
}

#[test]
fn test_select_breakpoints_rejects_unknown() {
    let err = select_breakpoints(default_breakpoints(), &["tablet_dark".to_string()])
        .unwrap_err()
        .to_string();
    assert!(err.contains("tablet_dark"));
    assert!(err.contains("desktop_dark"));
}
