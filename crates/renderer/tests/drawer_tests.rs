//! Tests for the drawing backends.
//!
//! The command drawer tests drive `/bin/sh` scripts and only run on Unix.

use std::time::Duration;

use renderer::png::PNG_SIGNATURE;
use renderer::{CommandDrawer, PreviewDrawer};
use test_utils::quokka_handle;
use viz_common::{DrawError, Drawer, PlotParameters};
use viz_protocol::{ParameterResolver, RawRenderRequest, RenderPurpose};

// ============================================================================
// Helpers
// ============================================================================

fn resolve(pairs: &[(&str, &str)]) -> PlotParameters {
    let handle = quokka_handle("plt00000");
    ParameterResolver::default()
        .resolve(
            &RawRenderRequest::from_pairs(pairs.iter().copied()),
            handle.catalog(),
            RenderPurpose::Interactive,
        )
        .unwrap()
}

#[cfg(unix)]
fn shell(script: &str, timeout: Duration) -> CommandDrawer {
    CommandDrawer::new("/bin/sh", vec!["-c".to_string(), script.to_string()], timeout)
}

// ============================================================================
// Command drawer
// ============================================================================

#[cfg(unix)]
#[tokio::test]
async fn test_command_output_becomes_artifact() {
    let drawer = shell("cat > /dev/null; printf 'fakepng'", Duration::from_secs(5));
    let artifact = drawer
        .draw(&quokka_handle("plt00000"), &resolve(&[]))
        .await
        .unwrap();
    assert_eq!(&artifact.data[..], b"fakepng");
    assert_eq!(artifact.content_type, "image/png");
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_receives_json_job() {
    // Echo the job back so the test can inspect it.
    let drawer = shell("cat", Duration::from_secs(5));
    let handle = quokka_handle("plt00042");
    let params = resolve(&[("field", "gas:temperature")]);
    let artifact = drawer.draw(&handle, &params).await.unwrap();

    let job: serde_json::Value = serde_json::from_slice(&artifact.data).unwrap();
    assert_eq!(job["dataset_name"], "plt00042");
    assert_eq!(job["params"]["field"]["namespace"], "gas");
    assert_eq!(job["params"]["field"]["name"], "temperature");
    assert_eq!(job["params"]["kind"], "slice");
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_failure_reports_stderr() {
    let drawer = shell("echo 'no such field' >&2; exit 3", Duration::from_secs(5));
    let err = drawer
        .draw(&quokka_handle("plt00000"), &resolve(&[]))
        .await
        .unwrap_err();
    assert_eq!(err, DrawError::Backend("no such field".to_string()));
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_empty_output() {
    let drawer = shell("cat > /dev/null", Duration::from_secs(5));
    let err = drawer
        .draw(&quokka_handle("plt00000"), &resolve(&[]))
        .await
        .unwrap_err();
    assert!(matches!(err, DrawError::Backend(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_timeout() {
    let timeout = Duration::from_millis(200);
    let drawer = shell("sleep 5", timeout);
    let err = drawer
        .draw(&quokka_handle("plt00000"), &resolve(&[]))
        .await
        .unwrap_err();
    assert_eq!(err, DrawError::Timeout(timeout));
}

#[tokio::test]
async fn test_missing_program() {
    let drawer = CommandDrawer::new("/nonexistent/plotter", Vec::new(), Duration::from_secs(1));
    let err = drawer
        .draw(&quokka_handle("plt00000"), &resolve(&[]))
        .await
        .unwrap_err();
    assert!(matches!(err, DrawError::Backend(_)));
}

// ============================================================================
// Preview drawer
// ============================================================================

#[tokio::test]
async fn test_preview_is_png() {
    let artifact = PreviewDrawer::default()
        .draw(
            &quokka_handle("plt00000"),
            &resolve(&[("width_px", "64"), ("height_px", "48"), ("grids", "true")]),
        )
        .await
        .unwrap();
    assert_eq!(&artifact.data[..8], &PNG_SIGNATURE);
}

#[tokio::test]
async fn test_preview_volume() {
    let artifact = PreviewDrawer::default()
        .draw(&quokka_handle("plt00000"), &resolve(&[("kind", "vol"), ("camera_theta", "30")]))
        .await
        .unwrap();
    assert_eq!(&artifact.data[..8], &PNG_SIGNATURE);
}

#[tokio::test]
async fn test_preview_pixel_cap() {
    let err = PreviewDrawer::new(100 * 100)
        .draw(&quokka_handle("plt00000"), &resolve(&[("dpi", "100")]))
        .await
        .unwrap_err();
    assert!(matches!(err, DrawError::Unsupported(_)));
}

#[tokio::test]
async fn test_preview_differs_by_axis() {
    let handle = quokka_handle("plt00000");
    let drawer = PreviewDrawer::default();
    let x = drawer
        .render_png(&handle, &resolve(&[("axis", "x"), ("width_px", "32"), ("height_px", "32")]))
        .unwrap();
    let z = drawer
        .render_png(&handle, &resolve(&[("axis", "z"), ("width_px", "32"), ("height_px", "32")]))
        .unwrap();
    assert_ne!(x, z);
}
