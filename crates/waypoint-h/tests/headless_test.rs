use serial_test::serial;
use waypoint_engine::config::SurfaceConfig;
use waypoint_engine::protocol::{ActionKind, ClassifiedAction, Gesture, Probe};
use waypoint_engine::surface::Surface;
use waypoint_h::HeadlessSurface;

const PAGE: &str = "<html><head><title>Workspace</title></head><body>\
<main><h1>Projects</h1>\
<button id='create' onclick=\"document.getElementById('modal').style.display='block'\">Create Project</button>\
<div id='modal' role='dialog' style='display:none'><p>New Project</p>\
<input type='text' aria-label='Project name'/>\
<button onclick=\"this.parentNode.style.display='none'\">Close</button></div>\
</main></body></html>";

async fn launched() -> Option<HeadlessSurface> {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let mut surface = HeadlessSurface::new(SurfaceConfig::default());
    match surface.launch().await {
        Ok(_) => Some(surface),
        Err(e) => {
            eprintln!("Failed to launch browser (is Chromium installed?): {}", e);
            None
        }
    }
}

#[tokio::test]
#[serial]
async fn test_headless_capture_perform_and_probe() {
    let Some(mut surface) = launched().await else {
        return;
    };

    let url = format!("data:text/html,{}", PAGE);
    let nav = surface.navigate(&url).await.expect("Navigation failed");
    assert_eq!(nav.title, "Workspace");

    let main = surface
        .probe(&Probe::RoleVisible {
            role: "main".into(),
            name: None,
        })
        .await
        .expect("probe failed");
    assert!(main.found);

    let capture = surface.capture().await.expect("Capture failed");
    let create = capture
        .elements
        .iter()
        .find(|e| e.text == "Create Project")
        .cloned()
        .expect("Create Project button not captured");
    assert!(capture.ax_tree.is_object());

    let dialog = surface.probe(&Probe::DialogPresent).await.expect("probe");
    assert!(!dialog.found);

    let click = ClassifiedAction {
        kind: ActionKind::Click,
        value: None,
        label: Some("Create Project".into()),
        aria_label: None,
    };
    surface.perform(&create, &click).await.expect("Click failed");

    let text = surface.probe(&Probe::DialogText).await.expect("probe");
    assert!(text.found);
    assert!(text.text.unwrap_or_default().contains("New Project"));

    let fill = ClassifiedAction {
        kind: ActionKind::Fill,
        value: Some("Roadmap".into()),
        label: None,
        aria_label: None,
    };
    surface.perform(&create, &fill).await.expect("Fill failed");
    let textbox = surface
        .probe(&Probe::Textbox {
            prefer_dialog: true,
        })
        .await
        .expect("probe");
    assert_eq!(textbox.text.as_deref(), Some("Roadmap"));

    let dismissed = surface
        .gesture(&Gesture::ClickByRole {
            role: "button".into(),
            name: "Close".into(),
        })
        .await
        .expect("gesture failed");
    assert!(dismissed);
    assert!(
        surface
            .gesture(&Gesture::PressKey {
                key: "Escape".into()
            })
            .await
            .expect("press key failed")
    );

    let png = surface.screenshot().await.expect("Screenshot failed");
    assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));

    surface.close().await.expect("Close failed");
}

#[tokio::test]
#[serial]
async fn test_headless_unknown_label_falls_back_to_record() {
    let Some(mut surface) = launched().await else {
        return;
    };

    let url = format!("data:text/html,{}", PAGE);
    surface.navigate(&url).await.expect("Navigation failed");
    let capture = surface.capture().await.expect("Capture failed");
    let create = capture
        .elements
        .iter()
        .find(|e| e.text == "Create Project")
        .cloned()
        .expect("Create Project button not captured");

    let click = ClassifiedAction {
        kind: ActionKind::Click,
        value: None,
        label: Some("Nothing Like This".into()),
        aria_label: None,
    };
    surface.perform(&create, &click).await.expect("Click failed");
    assert!(surface.probe(&Probe::DialogPresent).await.expect("probe").found);

    surface.close().await.expect("Close failed");
}

#[tokio::test]
#[serial]
async fn test_headless_form_fields_are_named_by_label_or_placeholder() {
    let Some(mut surface) = launched().await else {
        return;
    };

    let page = "<html><body><main>\
<input type='text' placeholder='Project name'/>\
<label for='summary'>Summary</label><textarea id='summary'></textarea>\
<input type='email'/>\
</main></body></html>";
    surface
        .navigate(&format!("data:text/html,{}", page))
        .await
        .expect("Navigation failed");

    let capture = surface.capture().await.expect("Capture failed");
    let named: Vec<(&str, &str)> = capture
        .elements
        .iter()
        .map(|e| (e.tag.as_str(), e.text.as_str()))
        .collect();
    assert!(named.contains(&("input", "Project name")), "{:?}", named);
    assert!(named.contains(&("textarea", "Summary")), "{:?}", named);
    assert!(named.contains(&("input", "")), "{:?}", named);

    surface.close().await.expect("Close failed");
}
