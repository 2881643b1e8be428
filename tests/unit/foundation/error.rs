use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        PrintError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        PrintError::missing_input("x")
            .to_string()
            .contains("missing input:")
    );
    assert!(PrintError::render("x").to_string().contains("render error:"));
    assert!(PrintError::cancelled("x").to_string().contains("cancelled:"));
}

#[test]
fn kind_names_every_variant() {
    assert_eq!(PrintError::validation("x").kind(), "ValidationError");
    assert_eq!(PrintError::missing_input("x").kind(), "MissingInputError");
    assert_eq!(PrintError::render("x").kind(), "RenderError");
    assert_eq!(PrintError::cancelled("x").kind(), "Cancelled");
    let io = PrintError::from(std::io::Error::other("boom"));
    assert_eq!(io.kind(), "IoError");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = PrintError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn detail_flattens_context_chain() {
    let err: PrintError = anyhow::Error::new(std::io::Error::other("disk full"))
        .context("write output")
        .into();
    assert_eq!(err.detail(), "write output: disk full");
    assert_eq!(PrintError::render("bad").detail(), "render error: bad");
}
