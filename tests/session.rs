mod common;

use std::{sync::atomic::Ordering, sync::Arc, time::Duration};

use capture_engine::media::{ImageSequenceVideo, MediaSlot};
use capture_engine::models::{CaptureMode, LatestFrame, RemoteStatus, SessionStatus, SourceType};
use capture_engine::session::{
    CaptureController, EndReason, EngineEvent, SourceInput, StartRequest,
};
use capture_engine::settings::InferenceSettings;
use tokio::time::sleep;

use common::{
    controller_deps, detection, drain, named_frame, solid_frame, FakeCamera, MockService, JOB_ID,
};

fn request(source: SourceInput) -> StartRequest {
    StartRequest::new(source).with_model("yolo-n")
}

fn ended_reason(events: &[EngineEvent]) -> Option<EndReason> {
    events.iter().find_map(|event| match event {
        EngineEvent::SessionEnded { reason, .. } => Some(*reason),
        _ => None,
    })
}

#[tokio::test(start_paused = true)]
async fn batch_results_land_in_file_order() {
    let service = MockService::new();
    service.set_results(vec![
        detection("r0", Some(0)),
        detection("r1", Some(1)),
        detection("r2", Some(2)),
    ]);
    service.script(&[(RemoteStatus::Running, 1), (RemoteStatus::Completed, 3)]);
    let (deps, mut events) = controller_deps(&service);
    let gallery = Arc::clone(&deps.gallery);
    let controller = CaptureController::new(SourceType::Batch, CaptureMode::Continuous, deps).unwrap();

    let frames = vec![named_frame("a.png"), named_frame("b.png"), named_frame("c.png")];
    let session = controller.start(request(SourceInput::Batch(frames))).await.unwrap();
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.id, JOB_ID);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(gallery.len(), 1);

    sleep(Duration::from_secs(1)).await;
    let names: Vec<_> = gallery.entries().iter().map(|e| e.file_name.clone()).collect();
    assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    assert_eq!(gallery.current_index(), Some(0));
    assert_eq!(controller.status().await, SessionStatus::Ended);

    let events = drain(&mut events);
    assert_eq!(ended_reason(&events), Some(EndReason::Completed));
    // A finished job needs no remote stop.
    assert!(service.stops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_model_fails_before_any_request() {
    let service = MockService::new();
    let (deps, mut events) = controller_deps(&service);
    let controller = CaptureController::new(SourceType::Batch, CaptureMode::Continuous, deps).unwrap();

    let err = controller
        .start(StartRequest::new(SourceInput::Batch(vec![named_frame("a.png")])))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "precondition");
    assert!(service.calls().is_empty());
    assert_eq!(controller.status().await, SessionStatus::Idle);
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, EngineEvent::Error { kind, .. } if kind == "precondition")));
}

#[tokio::test(start_paused = true)]
async fn unready_sources_fail_before_any_request() {
    let service = MockService::new();
    let (deps, _events) = controller_deps(&service);

    let batch = CaptureController::new(SourceType::Batch, CaptureMode::Continuous, deps.clone()).unwrap();
    let err = batch.start(request(SourceInput::Batch(Vec::new()))).await.unwrap_err();
    assert_eq!(err.kind(), "precondition");

    let rtsp = CaptureController::new(SourceType::Rtsp, CaptureMode::Continuous, deps.clone()).unwrap();
    let err = rtsp
        .start(request(SourceInput::Rtsp("not a url".into())))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "precondition");

    let wrong_kind = rtsp
        .start(request(SourceInput::Image(named_frame("a.png"))))
        .await
        .unwrap_err();
    assert_eq!(wrong_kind.kind(), "precondition");

    assert!(service.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn manual_batch_is_not_a_controller() {
    let service = MockService::new();
    let (deps, _events) = controller_deps(&service);
    let err = CaptureController::new(SourceType::Batch, CaptureMode::Manual, deps).err().unwrap();
    assert_eq!(err.kind(), "precondition");
}

#[tokio::test(start_paused = true)]
async fn single_image_is_one_round_trip() {
    let service = MockService::new();
    let (deps, _events) = controller_deps(&service);
    let gallery = Arc::clone(&deps.gallery);
    let controller = CaptureController::new(SourceType::Image, CaptureMode::Manual, deps).unwrap();

    let session = controller
        .start(request(SourceInput::Image(named_frame("cat.jpg"))))
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Ended);
    assert_eq!(session.results_count, 1);
    assert_eq!(service.calls(), vec!["start_single"]);
    assert_eq!(gallery.len(), 1);
    assert_eq!(gallery.current().unwrap().file_name, "cat.jpg");
    assert_eq!(controller.status().await, SessionStatus::Ended);
}

#[tokio::test(start_paused = true)]
async fn idle_manual_session_warns_then_stops_once() {
    let service = MockService::new();
    let camera = FakeCamera::new();
    let (deps, mut events) = controller_deps(&service);
    let slot = deps.media_slot.clone();
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps).unwrap();

    controller
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap();
    assert!(slot.is_bound());

    sleep(Duration::from_secs(95)).await;
    let warned = drain(&mut events)
        .iter()
        .filter(|e| matches!(e, EngineEvent::InactivityWarning { .. }))
        .count();
    assert_eq!(warned, 1);
    assert!(controller.is_active().await);
    // Immediate heartbeat plus 25s, 50s and 75s.
    assert_eq!(service.heartbeats(), 4);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(controller.status().await, SessionStatus::Ended);
    assert_eq!(service.stops(), vec![JOB_ID]);
    assert_eq!(camera.released(), 1);
    assert!(!slot.is_bound());
    assert_eq!(ended_reason(&drain(&mut events)), Some(EndReason::Inactivity));

    sleep(Duration::from_secs(300)).await;
    assert_eq!(service.stops().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn capture_during_grace_keeps_session_alive() {
    let service = MockService::new();
    let camera = FakeCamera::new();
    let (deps, mut events) = controller_deps(&service);
    let gallery = Arc::clone(&deps.gallery);
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps).unwrap();
    controller
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap();

    sleep(Duration::from_secs(95)).await;
    let entry = controller.capture_frame().await.unwrap();
    assert_eq!(entry.detection_result.result_id, "cap-1");
    assert!(entry.timestamp.is_some());

    sleep(Duration::from_secs(40)).await;
    assert!(controller.is_active().await);
    assert!(service.stops().is_empty());
    assert_eq!(gallery.len(), 1);

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(e, EngineEvent::Flash)));
    assert!(events.iter().any(|e| matches!(e, EngineEvent::ShutterSound)));
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn manual_captures_prepend_newest_first() {
    let service = MockService::new();
    let camera = FakeCamera::new();
    let (deps, _events) = controller_deps(&service);
    let gallery = Arc::clone(&deps.gallery);
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps).unwrap();
    controller
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap();

    controller.capture_frame().await.unwrap();
    controller.capture_frame().await.unwrap();

    let ids: Vec<_> = gallery
        .entries()
        .iter()
        .map(|e| e.detection_result.result_id.clone())
        .collect();
    assert_eq!(ids, vec!["cap-2", "cap-1"]);
    assert_eq!(controller.session().await.unwrap().results_count, 2);
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_with_heartbeat_in_flight_completes() {
    let service = MockService::new();
    service.heartbeat_hangs.store(true, Ordering::SeqCst);
    let camera = FakeCamera::new();
    let (deps, _events) = controller_deps(&service);
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps).unwrap();
    controller
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap();

    sleep(Duration::from_millis(10)).await;
    assert_eq!(service.heartbeats(), 1);

    controller.stop().await;
    assert_eq!(controller.status().await, SessionStatus::Ended);
    assert_eq!(service.stops(), vec![JOB_ID]);
    assert_eq!(camera.released(), 1);

    // The stuck heartbeat times out on its own; no further heartbeats follow.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(service.heartbeats(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent() {
    let service = MockService::new();
    let (deps, mut events) = controller_deps(&service);
    let controller = CaptureController::new(SourceType::Rtsp, CaptureMode::Continuous, deps).unwrap();

    controller.stop().await;
    assert!(service.stops().is_empty());

    controller
        .start(request(SourceInput::Rtsp("rtsp://cam.local/live".into())))
        .await
        .unwrap();
    controller.stop().await;
    controller.stop().await;

    assert_eq!(service.stops().len(), 1);
    let ended = drain(&mut events)
        .iter()
        .filter(|e| matches!(e, EngineEvent::SessionEnded { .. }))
        .count();
    assert_eq!(ended, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_remote_stop_still_ends_locally() {
    let service = MockService::new();
    service.stop_fails.store(true, Ordering::SeqCst);
    let camera = FakeCamera::new();
    let (deps, _events) = controller_deps(&service);
    let slot = deps.media_slot.clone();
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Continuous, deps).unwrap();
    controller
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap();

    controller.stop().await;

    assert_eq!(controller.status().await, SessionStatus::Ended);
    assert_eq!(camera.released(), 1);
    assert!(!slot.is_bound());
}

#[tokio::test(start_paused = true)]
async fn capture_requires_an_active_manual_session() {
    let service = MockService::new();
    let camera = FakeCamera::new();
    let (deps, _events) = controller_deps(&service);

    let manual = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps.clone()).unwrap();
    assert_eq!(manual.capture_frame().await.unwrap_err().kind(), "invalid-state");

    let continuous = CaptureController::new(SourceType::Webcam, CaptureMode::Continuous, deps).unwrap();
    continuous
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap();
    assert_eq!(continuous.capture_frame().await.unwrap_err().kind(), "invalid-state");
    continuous.stop().await;

    manual
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap();
    manual.stop().await;
    assert_eq!(manual.capture_frame().await.unwrap_err().kind(), "invalid-state");
}

#[tokio::test(start_paused = true)]
async fn media_element_is_exclusive() {
    let service = MockService::new();
    let camera = FakeCamera::new();
    let (deps, _events) = controller_deps(&service);
    let first = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps.clone()).unwrap();
    let second = CaptureController::new(SourceType::Video, CaptureMode::Manual, deps).unwrap();

    first
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap();

    let video = ImageSequenceVideo::new("clip.mp4", vec![solid_frame([1, 2, 3, 255])], 1.0).unwrap();
    let err = second
        .start(request(SourceInput::Video(Box::new(video))))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "resource-acquisition");
    assert_eq!(service.count("start_video_session"), 0);

    first.stop().await;
    let video = ImageSequenceVideo::new("clip.mp4", vec![solid_frame([1, 2, 3, 255])], 1.0).unwrap();
    second
        .start(request(SourceInput::Video(Box::new(video))))
        .await
        .unwrap();
    second.stop().await;
}

#[tokio::test(start_paused = true)]
async fn denied_camera_creates_no_session() {
    let service = MockService::new();
    let camera = FakeCamera::new();
    camera.deny.store(true, Ordering::SeqCst);
    let (deps, _events) = controller_deps(&service);
    let slot: MediaSlot = deps.media_slot.clone();
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps).unwrap();

    let err = controller
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "resource-acquisition");
    assert!(service.calls().is_empty());
    assert!(controller.session().await.is_none());
    assert!(!slot.is_bound());
}

#[tokio::test(start_paused = true)]
async fn failed_remote_start_releases_the_camera() {
    let service = MockService::new();
    service.start_fails.store(true, Ordering::SeqCst);
    let camera = FakeCamera::new();
    let (deps, _events) = controller_deps(&service);
    let slot = deps.media_slot.clone();
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps).unwrap();

    let err = controller
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "transient-network");
    assert_eq!(camera.released(), 1);
    assert!(!slot.is_bound());
    assert_eq!(controller.status().await, SessionStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn continuous_webcam_honours_frame_skip() {
    let service = MockService::new();
    let camera = FakeCamera::new();
    let (deps, _events) = controller_deps(&service);
    let gallery = Arc::clone(&deps.gallery);
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Continuous, deps).unwrap();

    let inference = InferenceSettings {
        frame_skip: 1,
        ..Default::default()
    };
    controller
        .start(request(SourceInput::Webcam(camera.clone())).with_inference(inference))
        .await
        .unwrap();

    // Ticks at 0..=4s; every other one is submitted.
    sleep(Duration::from_millis(4_500)).await;
    assert_eq!(service.count("capture_frame"), 3);
    assert_eq!(gallery.len(), 3);
    assert_eq!(gallery.get(0).unwrap().detection_result.result_id, "cap-3");
    assert_eq!(service.last_params().unwrap().frame_skip, 1);

    controller.stop().await;
    sleep(Duration::from_secs(5)).await;
    assert_eq!(service.count("capture_frame"), 3);
}

#[tokio::test(start_paused = true)]
async fn stream_results_use_their_own_frames() {
    let service = MockService::new();
    let mut with_frame = detection("r0", Some(0));
    with_frame.source_frame = Some(solid_frame([10, 0, 0, 255]));
    let without_frame = detection("r1", Some(1));
    let mut later = detection("r2", Some(2));
    later.source_frame = Some(solid_frame([0, 10, 0, 255]));
    service.set_results(vec![with_frame, without_frame, later]);
    service.script(&[(RemoteStatus::Running, 2), (RemoteStatus::Completed, 3)]);

    let (deps, _events) = controller_deps(&service);
    let gallery = Arc::clone(&deps.gallery);
    let controller = CaptureController::new(SourceType::Rtsp, CaptureMode::Continuous, deps).unwrap();
    controller
        .start(request(SourceInput::Rtsp("rtsp://cam.local/live".into())))
        .await
        .unwrap();

    sleep(Duration::from_millis(2_500)).await;

    let ids: Vec<_> = gallery
        .entries()
        .iter()
        .map(|e| e.detection_result.result_id.clone())
        .collect();
    assert_eq!(ids, vec!["r2", "r0"]);
    assert_eq!(gallery.get(0).unwrap().original_image.get_pixel(0, 0)[1], 10);
    assert_eq!(controller.status().await, SessionStatus::Ended);
}

#[tokio::test(start_paused = true)]
async fn manual_stream_captures_the_latest_frame() {
    let service = MockService::new();
    let (deps, _events) = controller_deps(&service);
    let gallery = Arc::clone(&deps.gallery);
    let controller = CaptureController::new(SourceType::Rtsp, CaptureMode::Manual, deps).unwrap();
    controller
        .start(request(SourceInput::Rtsp("rtsp://cam.local/live".into())))
        .await
        .unwrap();

    sleep(Duration::from_millis(100)).await;
    let err = controller.capture_frame().await.unwrap_err();
    assert_eq!(err.kind(), "precondition");

    service.set_latest(Some(LatestFrame {
        frame: solid_frame([200, 0, 0, 255]),
        predictions: Some(detection("live", None)),
    }));
    sleep(Duration::from_secs(1)).await;
    assert!(controller.latest_preview().await.is_some());

    let entry = controller.capture_frame().await.unwrap();
    assert_eq!(entry.original_image.get_pixel(0, 0)[0], 200);
    assert_eq!(gallery.len(), 1);
    // Network streams are not watched.
    assert_eq!(service.heartbeats(), 0);
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn video_results_are_rendered_from_seeked_frames() {
    let service = MockService::new();
    let mut results = Vec::new();
    for (i, ts) in [0u64, 1_000, 2_000].into_iter().enumerate() {
        let mut result = detection(&format!("v{i}"), Some(i as u64));
        result.timestamp_ms = Some(ts);
        results.push(result);
    }
    service.set_results(results);
    service.script(&[(RemoteStatus::Completed, 3)]);

    let (deps, _events) = controller_deps(&service);
    let gallery = Arc::clone(&deps.gallery);
    let slot = deps.media_slot.clone();
    let controller = CaptureController::new(SourceType::Video, CaptureMode::Continuous, deps).unwrap();

    let frames = (0..3u8).map(|i| solid_frame([i * 50, 0, 0, 255])).collect();
    let video = ImageSequenceVideo::new("clip.mp4", frames, 1.0).unwrap();
    controller
        .start(request(SourceInput::Video(Box::new(video))))
        .await
        .unwrap();

    sleep(Duration::from_millis(100)).await;

    let reds: Vec<u8> = gallery
        .entries()
        .iter()
        .map(|e| e.original_image.get_pixel(0, 0)[0])
        .collect();
    assert_eq!(reds, vec![0, 50, 100]);
    assert_eq!(controller.status().await, SessionStatus::Ended);
    assert!(!slot.is_bound());
}

#[tokio::test(start_paused = true)]
async fn late_results_after_stop_are_dropped() {
    let service = MockService::new();
    service.set_results(vec![detection("r0", Some(0))]);
    service.script(&[(RemoteStatus::Running, 0), (RemoteStatus::Running, 1)]);
    let (deps, _events) = controller_deps(&service);
    let gallery = Arc::clone(&deps.gallery);
    let controller = CaptureController::new(SourceType::Batch, CaptureMode::Continuous, deps).unwrap();
    controller
        .start(request(SourceInput::Batch(vec![named_frame("a.png")])))
        .await
        .unwrap();

    sleep(Duration::from_millis(100)).await;
    controller.stop().await;
    sleep(Duration::from_secs(5)).await;

    assert!(gallery.is_empty());
    assert_eq!(service.count("get_status"), 1);
}

#[tokio::test(start_paused = true)]
async fn manual_webcam_previews_without_touching_the_gallery() {
    let service = MockService::new();
    let camera = FakeCamera::new();
    let (deps, mut events) = controller_deps(&service);
    let gallery = Arc::clone(&deps.gallery);
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps).unwrap();
    assert!(controller.latest_preview().await.is_none());

    controller
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap();

    // Preview ticks at 0, 500 and 1000ms.
    sleep(Duration::from_millis(1_200)).await;
    assert_eq!(service.count("preview_frame"), 3);
    assert_eq!(service.count("capture_frame"), 0);
    assert!(controller.latest_preview().await.is_some());
    assert!(gallery.is_empty());

    let previews: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::PreviewUpdate { session_id, detections } => Some((session_id, detections)),
            _ => None,
        })
        .collect();
    assert_eq!(previews, vec![(JOB_ID.to_string(), 1); 3]);

    controller.stop().await;
    sleep(Duration::from_secs(5)).await;
    assert_eq!(service.count("preview_frame"), 3);
    assert!(gallery.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_a_start_waiting_on_the_camera() {
    let service = MockService::new();
    let camera = FakeCamera::new();
    camera.hang.store(true, Ordering::SeqCst);
    let (deps, _events) = controller_deps(&service);
    let slot = deps.media_slot.clone();
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps).unwrap();

    let starting = tokio::spawn({
        let controller = controller.clone();
        let camera = camera.clone();
        async move { controller.start(request(SourceInput::Webcam(camera))).await }
    });
    sleep(Duration::from_millis(10)).await;
    assert_eq!(controller.status().await, SessionStatus::Idle);
    assert!(slot.is_bound());

    tokio::time::timeout(Duration::from_secs(1), controller.stop())
        .await
        .expect("stop should not wait for the camera");

    let err = starting.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), "invalid-state");
    assert!(service.calls().is_empty());
    assert!(!slot.is_bound());
    assert!(controller.session().await.is_none());

    camera.hang.store(false, Ordering::SeqCst);
    controller
        .start(request(SourceInput::Webcam(camera.clone())))
        .await
        .unwrap();
    controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn remote_handle_returned_after_stop_is_stopped() {
    let service = MockService::new();
    service.start_delay_ms.store(5_000, Ordering::SeqCst);
    let camera = FakeCamera::new();
    let (deps, mut events) = controller_deps(&service);
    let slot = deps.media_slot.clone();
    let controller = CaptureController::new(SourceType::Webcam, CaptureMode::Manual, deps).unwrap();

    let starting = tokio::spawn({
        let controller = controller.clone();
        let camera = camera.clone();
        async move { controller.start(request(SourceInput::Webcam(camera))).await }
    });
    sleep(Duration::from_secs(1)).await;
    assert_eq!(service.count("start_webcam_session"), 1);

    tokio::time::timeout(Duration::from_millis(100), controller.stop())
        .await
        .expect("stop should not wait for the remote start");

    let err = starting.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), "invalid-state");
    assert_eq!(service.stops(), vec![JOB_ID]);
    assert_eq!(camera.released(), 1);
    assert!(!slot.is_bound());
    assert_eq!(controller.status().await, SessionStatus::Idle);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(service.heartbeats(), 0);
    assert!(!drain(&mut events)
        .iter()
        .any(|e| matches!(e, EngineEvent::SessionStart { .. })));
}
