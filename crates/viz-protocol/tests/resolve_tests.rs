//! Resolution behaviour against the QUOKKA fixture catalog.

use test_utils::{fields, quokka_catalog};
use viz_common::{PlotKind, ResolutionError, WidthSpec};
use viz_protocol::{ParameterResolver, RawRenderRequest, RenderPurpose, ResolverConfig};

fn resolver() -> ParameterResolver {
    ParameterResolver::new(ResolverConfig::default())
}

fn raw(pairs: &[(&str, &str)]) -> RawRenderRequest {
    RawRenderRequest::from_pairs(pairs.iter().copied())
}

#[test]
fn test_resolution_is_idempotent() {
    let catalog = quokka_catalog();
    let request = raw(&[
        ("kind", "prj"),
        ("axis", "x"),
        ("field", "temperature"),
        ("weight_field", "density"),
        ("vmin", "10"),
        ("vmax", "1e7"),
        ("width_value", "2.5"),
        ("width_unit", "kpc"),
        ("particles", "Sink_particles,CIC_particles"),
        ("show_scale_bar", "true"),
        ("scale_bar_size", "0.5"),
        ("scale_bar_unit", "kpc"),
    ]);

    let first = resolver()
        .resolve(&request, &catalog, RenderPurpose::Interactive)
        .unwrap();
    let second = resolver()
        .resolve(&request, &catalog, RenderPurpose::Interactive)
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.kind, PlotKind::Projection);
    assert_eq!(first.weight_field, Some(fields::density()));
}

#[test]
fn test_unknown_field_is_rejected() {
    let err = resolver()
        .resolve(&raw(&[("field", "foo:bar")]), &quokka_catalog(), RenderPurpose::Interactive)
        .unwrap_err();
    assert_eq!(err, ResolutionError::UnknownField("foo:bar".to_string()));
}

#[test]
fn test_width_without_unit_is_rejected() {
    let err = resolver()
        .resolve(
            &raw(&[("width_value", "100"), ("width_unit", "")]),
            &quokka_catalog(),
            RenderPurpose::Interactive,
        )
        .unwrap_err();
    assert!(matches!(err, ResolutionError::MissingUnit { .. }));
}

#[test]
fn test_absent_width_is_full_domain() {
    let catalog = quokka_catalog();
    let a = resolver()
        .resolve(&RawRenderRequest::default(), &catalog, RenderPurpose::Interactive)
        .unwrap();
    let b = resolver()
        .resolve(&raw(&[("width_value", "  ")]), &catalog, RenderPurpose::Interactive)
        .unwrap();
    assert_eq!(a.width, WidthSpec::FullDomain);
    assert_eq!(a, b);
}

#[test]
fn test_switching_kind_and_back_is_stable() {
    let catalog = quokka_catalog();
    let slice = resolver()
        .resolve(&raw(&[("kind", "slc"), ("axis", "y")]), &catalog, RenderPurpose::Interactive)
        .unwrap();
    // Volume inputs left over from a previous view do not leak into a slice.
    let slice_again = resolver()
        .resolve(
            &raw(&[("kind", "slc"), ("axis", "y"), ("camera_theta", "90"), ("weight_field", "density")]),
            &catalog,
            RenderPurpose::Interactive,
        )
        .unwrap();
    assert_eq!(slice, slice_again);
}

#[test]
fn test_json_request() {
    let request: RawRenderRequest = serde_json::from_str(
        r#"{"kind":"vol","field":"gas:density","camera_theta":190,"camera_phi":30.5,
            "n_layers":8,"preview":false,"dpi":200}"#,
    )
    .unwrap();
    let params = resolver()
        .resolve(&request, &quokka_catalog(), RenderPurpose::Interactive)
        .unwrap();

    let volume = params.volume.unwrap();
    assert_eq!(volume.theta.get(), 180.0);
    assert_eq!(volume.phi.get(), 30.5);
    assert_eq!(volume.n_layers, 8);
    assert!(params.axis.is_none());
}

#[test]
fn test_custom_primary_namespace() {
    let config = ResolverConfig {
        primary_namespace: "boxlib".to_string(),
        ..ResolverConfig::default()
    };
    let params = ParameterResolver::new(config)
        .resolve(&raw(&[("field", "gasDensity")]), &quokka_catalog(), RenderPurpose::Interactive)
        .unwrap();
    assert_eq!(params.field, fields::native_density());
}
