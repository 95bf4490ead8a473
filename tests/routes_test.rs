use webhook_capture::{normalize_path, resolve, RouteDecision, RESERVED_PATH};

#[test]
fn reserved_path_bypasses_capture() {
    assert_eq!(resolve(RESERVED_PATH), RouteDecision::Reserved);
    assert_eq!(resolve("/graphql"), RouteDecision::Reserved);
    assert_eq!(resolve("//graphql"), RouteDecision::Reserved);
}

#[test]
fn paths_embedding_the_marker_are_still_captured() {
    assert_eq!(
        resolve("graphql-webhook"),
        RouteDecision::Capture("/graphql-webhook".to_string())
    );
    assert_eq!(
        resolve("/graphql/queries"),
        RouteDecision::Capture("/graphql/queries".to_string())
    );
    assert_eq!(
        resolve("graphqlsuffix"),
        RouteDecision::Capture("/graphqlsuffix".to_string())
    );
}

#[test]
fn empty_path_normalizes_to_root() {
    assert_eq!(normalize_path(""), "/");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(resolve(""), RouteDecision::Capture("/".to_string()));
}

#[test]
fn normalization_is_idempotent() {
    for raw in ["order", "/order", "//order", "order/refund", "/order/"] {
        let once = normalize_path(raw);
        let twice = normalize_path(&once);
        assert_eq!(once, twice);
        assert!(once.starts_with('/'));
        assert!(!once.starts_with("//"));
    }
}

#[test]
fn capture_paths_keep_their_segments() {
    assert_eq!(
        resolve("order/refund"),
        RouteDecision::Capture("/order/refund".to_string())
    );
}
