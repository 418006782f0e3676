use clap::Parser;
use rascheme::Config;
use std::path::PathBuf;

#[test]
fn default_init_script_path() {
    let cfg = Config::try_parse_from(["rascheme"]).expect("no args should parse");
    assert_eq!(cfg.init_script, PathBuf::from("./init.scm"));
}

#[test]
fn short_init_flag_overrides_path() {
    let cfg = Config::try_parse_from(["rascheme", "-i", "my-init.scm"]).expect("valid flag");
    assert_eq!(cfg.init_script, PathBuf::from("my-init.scm"));
}

#[test]
fn long_init_flag_overrides_path() {
    let cfg = Config::try_parse_from(["rascheme", "--init", "my-init.scm"]).expect("valid flag");
    assert_eq!(cfg.init_script, PathBuf::from("my-init.scm"));
}

#[test]
fn stray_positional_argument_is_a_usage_error() {
    assert!(Config::try_parse_from(["rascheme", "extra.scm"]).is_err());
}

#[test]
fn unknown_flag_is_a_usage_error() {
    assert!(Config::try_parse_from(["rascheme", "--frobnicate"]).is_err());
}
