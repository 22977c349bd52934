//! Loading generated plotfile directories end to end.

use plotfile::{list_plotfiles, PlotfileLoader};
use test_utils::{fields, quokka_catalog, require_test_file, temp_test_dir, PlotfileBuilder};
use viz_common::{FieldKey, LoadError, SnapshotLoader};

#[tokio::test]
async fn test_load_generated_plotfile() {
    let dir = temp_test_dir();
    let path = PlotfileBuilder::new("plt00010")
        .time(0.25)
        .with_particles()
        .write(dir.path())
        .unwrap();

    let snapshot = PlotfileLoader::new().load(&path).await.unwrap();
    assert_eq!(snapshot.info.current_time, 0.25);
    assert_eq!(snapshot.info.domain_dimensions, vec![64, 64, 64]);
    assert!(snapshot.catalog.contains(&fields::density()));
    assert_eq!(
        snapshot.catalog.particle_types(),
        ["CIC_particles".to_string(), "Sink_particles".to_string()]
    );
    assert!(snapshot.signature.len > 0);
}

#[tokio::test]
async fn test_catalog_matches_fixture() {
    let dir = temp_test_dir();
    let path = PlotfileBuilder::new("plt00000")
        .with_particles()
        .write(dir.path())
        .unwrap();

    let snapshot = PlotfileLoader::new().load(&path).await.unwrap();
    let expected = quokka_catalog();
    assert_eq!(snapshot.catalog.fields(), expected.fields());
}

#[tokio::test]
async fn test_missing_plotfile() {
    let dir = temp_test_dir();
    let err = PlotfileLoader::new()
        .load(&dir.path().join("plt99999"))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::NotFound(_)));
}

#[tokio::test]
async fn test_corrupt_header() {
    let dir = temp_test_dir();
    let path = dir.path().join("plt00000");
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(path.join("Header"), "HyperCLaw-V1.1\nnot-a-number\n").unwrap();

    let err = PlotfileLoader::new().load(&path).await.unwrap_err();
    assert!(matches!(err, LoadError::InvalidFormat { .. }));
}

#[tokio::test]
async fn test_particle_dir_without_header_is_ignored() {
    let dir = temp_test_dir();
    let path = PlotfileBuilder::new("plt00000").write(dir.path()).unwrap();
    std::fs::create_dir_all(path.join("Rad_particles")).unwrap();

    let snapshot = PlotfileLoader::new().load(&path).await.unwrap();
    assert!(snapshot.catalog.particle_types().is_empty());
}

#[test]
fn test_list_plotfiles_filters_and_sorts() {
    let dir = temp_test_dir();
    for name in ["plt00020", "plt00000", "chk00010", "plt00010"] {
        PlotfileBuilder::new(name).write(dir.path()).unwrap();
    }
    std::fs::write(dir.path().join("plt_notes.txt"), "not a directory").unwrap();

    let names = list_plotfiles(dir.path(), "plt").unwrap();
    assert_eq!(names, vec!["plt00000", "plt00010", "plt00020"]);
}

#[test]
fn test_custom_variables() {
    let dir = temp_test_dir();
    let path = PlotfileBuilder::new("plt00000")
        .variables(&["radEnergy-Group0"])
        .dimensions([16, 16, 16])
        .write(dir.path())
        .unwrap();

    let snapshot = PlotfileLoader::load_blocking(&path).unwrap();
    assert_eq!(
        snapshot.catalog.first(),
        Some(&FieldKey::new("boxlib", "radEnergy-Group0"))
    );
    assert!(!snapshot.catalog.contains(&fields::density()));
    assert_eq!(snapshot.info.domain_dimensions, vec![16, 16, 16]);
}

#[tokio::test]
async fn test_real_plotfile() {
    let path = require_test_file!("plt00000");
    let snapshot = PlotfileLoader::new().load(&path).await.unwrap();
    assert!(!snapshot.catalog.is_empty());
}
