//! End-to-end tests of the HTTP routes against an in-process router
//!
//! Cloud providers are left unconfigured and the local tool points at a binary that
//! does not exist, so every removal route exercises its failure path here. Successful
//! removals are covered in `providers.rs`.

mod common;

use axum::http::StatusCode;
use axum_test::multipart::MultipartForm;
use common::{encode, gradient, image_form, image_part, jpeg, list_dir, load, png, solid, TestApp};
use image::{GenericImageView, ImageFormat};
use product_studio::{api::ErrorBody, Endpoint};
use serde_json::Value;

#[tokio::test]
async fn test_every_route_rejects_a_request_without_an_image() {
    let app = TestApp::new();

    for endpoint in Endpoint::all() {
        let form = MultipartForm::new().add_text("width", "100");
        let response = app.server.post(&endpoint.path()).multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorBody = response.json();
        assert!(!body.success, "{endpoint}");

        let expected = match endpoint {
            Endpoint::BatchProcess => "No images uploaded",
            Endpoint::CreateLifestyle => "Both product and background images are required",
            _ => "No image uploaded",
        };
        assert_eq!(body.error, expected, "{endpoint}");
        assert!(body.details.is_none(), "{endpoint}");
    }

    assert!(list_dir(&app.processed_dir()).is_empty());
    assert!(list_dir(&app.uploads_dir()).is_empty());
}

#[tokio::test]
async fn test_every_route_answers_non_multipart_bodies_with_json() {
    let app = TestApp::new();

    for endpoint in Endpoint::all() {
        let path = endpoint.path();
        let responses = [
            app.server.post(&path).await,
            app.server.post(&path).json(&serde_json::json!({"width": 100})).await,
            app.server.post(&path).text("image=shoe.jpg").await,
        ];

        for response in responses {
            response.assert_status(StatusCode::BAD_REQUEST);
            let body: ErrorBody = response.json();
            assert!(!body.success, "{endpoint}");
            let expected = match endpoint {
                Endpoint::BatchProcess => "No images uploaded",
                Endpoint::CreateLifestyle => "Both product and background images are required",
                _ => "No image uploaded",
            };
            assert_eq!(body.error, expected, "{endpoint}");
        }
    }

    assert!(list_dir(&app.processed_dir()).is_empty());
}

#[tokio::test]
async fn test_upload_stores_original_bytes() {
    let app = TestApp::new();
    let data = jpeg(64, 48);

    let response = app
        .server
        .post("/api/upload")
        .multipart(image_form("Product Shot.JPG", data.clone()))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Image uploaded successfully");

    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with(".jpg"));
    assert_eq!(body["path"].as_str().unwrap(), format!("/uploads/{filename}"));

    let stored = std::fs::read(app.uploads_dir().join(filename)).unwrap();
    assert_eq!(stored, data);
}

#[tokio::test]
async fn test_upload_rejects_non_image_data() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/upload")
        .multipart(image_form("notes.png", b"definitely not an image".to_vec()))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(list_dir(&app.uploads_dir()).is_empty());
}

#[tokio::test]
async fn test_upload_over_the_size_limit() {
    let app = TestApp::with_config(|builder| builder.max_upload_bytes(1024));

    let response = app
        .server
        .post("/api/upload")
        .multipart(image_form("large.png", vec![0u8; 4096]))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: ErrorBody = response.json();
    assert!(body.error.contains("exceeds the maximum upload size"));
    assert!(list_dir(&app.uploads_dir()).is_empty());
}

#[tokio::test]
async fn test_resize_width_only_keeps_aspect_ratio() {
    let app = TestApp::new();

    let form = image_form("wide.png", png(400, 200)).add_text("width", "100");
    let response = app.server.post("/api/resize").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Image resized successfully");

    let path = body["path"].as_str().unwrap();
    assert!(path.starts_with("/processed/resized-"));
    assert!(path.ends_with(".png"));
    assert_eq!(load(&app.file_for(path)).dimensions(), (100, 50));
}

#[tokio::test]
async fn test_resize_contain_fits_within_the_box() {
    let app = TestApp::new();

    let form = image_form("wide.jpg", jpeg(400, 200))
        .add_text("width", "300")
        .add_text("height", "300")
        .add_text("fit", "contain");
    let response = app.server.post("/api/resize").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let resized = load(&app.file_for(body["path"].as_str().unwrap()));

    assert_eq!(resized.dimensions(), (300, 300));
    // Letterbox bands above and below the 300x150 product are transparent
    assert_eq!(resized.get_pixel(150, 10).0[3], 0);
    assert_eq!(resized.get_pixel(150, 150).0[3], 255);
}

#[tokio::test]
async fn test_resize_rejects_out_of_range_dimensions() {
    let app = TestApp::new();

    for (name, value) in [("width", "0"), ("width", "abc"), ("height", "20000")] {
        let form = image_form("a.png", png(40, 40)).add_text(name, value);
        let response = app.server.post("/api/resize").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorBody = response.json();
        assert!(body.error.contains(name), "{name}={value}: {}", body.error);
    }

    let form = image_form("a.png", png(40, 40)).add_text("fit", "stretch").add_text("width", "10");
    app.server
        .post("/api/resize")
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert!(list_dir(&app.processed_dir()).is_empty());
}

#[tokio::test]
async fn test_optimize_defaults_to_webp_and_reports_sizes() {
    let app = TestApp::new();
    let data = png(320, 240);
    let original_size = data.len();

    let response = app
        .server
        .post("/api/optimize")
        .multipart(image_form("photo.png", data))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["originalSize"].as_u64().unwrap() as usize, original_size);
    assert!(body["savings"].as_str().unwrap().ends_with('%'));

    let path = body["path"].as_str().unwrap();
    assert!(path.starts_with("/processed/optimized-"));
    assert!(path.ends_with(".webp"));

    let written = std::fs::read(app.file_for(path)).unwrap();
    assert_eq!(written.len() as u64, body["optimizedSize"].as_u64().unwrap());
    assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::WebP);
}

#[tokio::test]
async fn test_optimize_twice_converges() {
    let app = TestApp::new();

    let form = image_form("photo.jpg", jpeg(200, 200))
        .add_text("format", "jpeg")
        .add_text("quality", "60");
    let first: Value = app.server.post("/api/optimize").multipart(form).await.json();
    let first_bytes = std::fs::read(app.file_for(first["path"].as_str().unwrap())).unwrap();

    let form = image_form("again.jpg", first_bytes.clone())
        .add_text("format", "jpeg")
        .add_text("quality", "60");
    let second: Value = app.server.post("/api/optimize").multipart(form).await.json();

    assert_eq!(second["originalSize"].as_u64().unwrap() as usize, first_bytes.len());
    let second_size = second["optimizedSize"].as_u64().unwrap() as f64;
    let ratio = second_size / first_bytes.len() as f64;
    assert!(ratio > 0.8 && ratio < 1.2, "re-optimizing changed size by {ratio}");
}

#[tokio::test]
async fn test_optimize_same_input_gives_identical_output() {
    let app = TestApp::new();
    let data = encode(&gradient(160, 120), ImageFormat::Png);

    for format in [None, Some("jpeg")] {
        let mut stored = Vec::new();
        for _ in 0..2 {
            let mut form = image_form("photo.png", data.clone()).add_text("quality", "70");
            if let Some(format) = format {
                form = form.add_text("format", format);
            }
            let response = app.server.post("/api/optimize").multipart(form).await;
            response.assert_status_ok();
            let body: Value = response.json();
            stored.push(std::fs::read(app.file_for(body["path"].as_str().unwrap())).unwrap());
        }
        assert_eq!(stored[0], stored[1], "format {format:?}");
    }

    assert_eq!(list_dir(&app.processed_dir()).len(), 4);
}

#[tokio::test]
async fn test_optimize_too_wide_for_webp_fails_cleanly() {
    let app = TestApp::new();

    let form = image_form("banner.png", png(16400, 1));
    let response = app.server.post("/api/optimize").multipart(form).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json();
    assert_eq!(body.error, "Failed to optimize image");
    let details = body.details.unwrap();
    assert!(details.contains("WebP"), "{details}");
    assert!(!details.contains("panicked"), "{details}");
    assert!(list_dir(&app.processed_dir()).is_empty());
}

#[tokio::test]
async fn test_optimize_rejects_bad_quality() {
    let app = TestApp::new();

    let form = image_form("photo.png", png(20, 20)).add_text("quality", "101");
    let response = app.server.post("/api/optimize").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json();
    assert!(body.error.contains("quality"));
}

#[tokio::test]
async fn test_adjust_keeps_dimensions() {
    let app = TestApp::new();

    let form = image_form("photo.png", png(120, 80))
        .add_text("brightness", "1.2")
        .add_text("saturation", "0.8")
        .add_text("contrast", "1.5");
    let response = app.server.post("/api/adjust").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Adjustments applied successfully");
    let adjusted = load(&app.file_for(body["path"].as_str().unwrap()));
    assert_eq!(adjusted.dimensions(), (120, 80));
}

#[tokio::test]
async fn test_adjust_rejects_contrast_out_of_range() {
    let app = TestApp::new();

    let form = image_form("photo.png", png(20, 20)).add_text("contrast", "5");
    let response = app.server.post("/api/adjust").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json();
    assert!(body.error.contains("contrast"));
}

#[tokio::test]
async fn test_hero_banner_layout() {
    let app = TestApp::new();

    let form = image_form("lamp.png", png(300, 300))
        .add_text("title", "Desk Lamp")
        .add_text("price", "49.00");
    let response = app.server.post("/api/create-hero").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let hero = load(&app.file_for(body["path"].as_str().unwrap()));

    assert_eq!(hero.dimensions(), (1200, 628));
    assert_eq!(hero.get_pixel(900, 314).0, [255, 255, 255, 255]);
}

#[tokio::test]
async fn test_isometric_requires_dimensions() {
    let app = TestApp::new();

    let form = image_form("box.png", png(100, 100)).add_text("width", "10");
    let response = app.server.post("/api/create-isometric").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let form = image_form("box.png", png(100, 100))
        .add_text("width", "10")
        .add_text("height", "20")
        .add_text("depth", "5");
    let response = app.server.post("/api/create-isometric").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let preview = load(&app.file_for(body["path"].as_str().unwrap()));
    assert_eq!(preview.dimensions(), (800, 600));
}

#[tokio::test]
async fn test_lifestyle_shows_background_through_transparent_product() {
    let app = TestApp::new();

    // Opaque red square in the middle of a transparent product image
    let mut product = image::RgbaImage::from_pixel(100, 100, image::Rgba([0, 0, 0, 0]));
    for x in 40..60 {
        for y in 40..60 {
            product.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
        }
    }
    let product = common::encode(&image::DynamicImage::ImageRgba8(product), ImageFormat::Png);
    let background = common::encode(&solid(640, 360, [0, 0, 255, 255]), ImageFormat::Png);

    let form = MultipartForm::new()
        .add_part("product", image_part("product.png", product))
        .add_part("background", image_part("scene.png", background));
    let response = app.server.post("/api/create-lifestyle").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let path = body["path"].as_str().unwrap();
    assert!(path.starts_with("/processed/lifestyle-"));

    let composite = load(&app.file_for(path));
    assert_eq!(composite.dimensions(), (1920, 1080));

    let close = |actual: [u8; 4], expected: [u8; 4]| {
        actual
            .iter()
            .zip(expected)
            .all(|(a, e)| (i16::from(*a) - i16::from(e)).abs() <= 2)
    };
    // Transparent corner of the 800x800 product box, placed at (560, 140)
    assert!(close(composite.get_pixel(565, 145).0, [0, 0, 255, 255]));
    assert!(close(composite.get_pixel(0, 0).0, [0, 0, 255, 255]));
    assert!(close(composite.get_pixel(960, 540).0, [255, 0, 0, 255]));
}

#[tokio::test]
async fn test_lifestyle_requires_both_images() {
    let app = TestApp::new();

    let form = MultipartForm::new().add_part("product", image_part("product.png", png(50, 50)));
    let response = app.server.post("/api/create-lifestyle").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json();
    assert_eq!(body.error, "Both product and background images are required");
}

#[tokio::test]
async fn test_batch_applies_operations_in_order() {
    let app = TestApp::new();
    let operations = r#"[
        {"type": "resize", "width": 50},
        {"type": "optimize", "format": "webp", "quality": 70}
    ]"#;

    let form = MultipartForm::new()
        .add_part("images", image_part("first.png", png(200, 100)))
        .add_part("images", image_part("second.jpg", jpeg(100, 200)))
        .add_text("operations", operations);
    let response = app.server.post("/api/batch-process").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "2 images processed successfully");

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["originalName"], "first.png");
    assert_eq!(results[1]["originalName"], "second.jpg");

    let first = results[0]["processedPath"].as_str().unwrap();
    let second = results[1]["processedPath"].as_str().unwrap();
    assert!(first.starts_with("/processed/batch-") && first.ends_with("-0.webp"));
    assert!(second.starts_with("/processed/batch-") && second.ends_with("-1.webp"));

    // Resize ran before optimize
    assert_eq!(load(&app.file_for(first)).dimensions(), (50, 25));
    assert_eq!(load(&app.file_for(second)).dimensions(), (50, 100));
}

#[tokio::test]
async fn test_batch_accepts_bracketed_field_name() {
    let app = TestApp::new();

    let form = MultipartForm::new()
        .add_part("images[]", image_part("only.png", png(80, 80)))
        .add_text("operations", r#"[{"type": "adjust", "brightness": 1.1}]"#);
    let response = app.server.post("/api/batch-process").multipart(form).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let path = body["results"][0]["processedPath"].as_str().unwrap();
    assert!(path.ends_with("-0.png"));
}

#[tokio::test]
async fn test_batch_rejects_malformed_operations() {
    let app = TestApp::new();

    for operations in ["not json", r#"{"type": "resize"}"#, ""] {
        let form = MultipartForm::new()
            .add_part("images", image_part("a.png", png(20, 20)))
            .add_text("operations", operations);
        let response = app.server.post("/api/batch-process").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    let form = MultipartForm::new()
        .add_part("images", image_part("a.png", png(20, 20)))
        .add_text("operations", r#"[{"type": "resize", "width": -5}]"#);
    let response = app.server.post("/api/batch-process").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json();
    assert!(body.error.contains("operation 0"));

    assert!(list_dir(&app.processed_dir()).is_empty());
}

#[tokio::test]
async fn test_batch_failure_leaves_no_artifacts() {
    let app = TestApp::new();

    // The second image cannot be decoded, so the whole batch fails
    let form = MultipartForm::new()
        .add_part("images", image_part("good.png", png(40, 40)))
        .add_part("images", image_part("broken.png", b"garbage".to_vec()))
        .add_text("operations", r#"[{"type": "resize", "width": 20}]"#);
    let response = app.server.post("/api/batch-process").multipart(form).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json();
    assert_eq!(body.error, "Failed to process batch");
    assert!(list_dir(&app.processed_dir()).is_empty());
}

#[tokio::test]
async fn test_batch_image_limit() {
    let app = TestApp::with_config(|builder| builder.max_batch_images(2));

    let mut form = MultipartForm::new().add_text("operations", r#"[{"type": "optimize"}]"#);
    for i in 0..3 {
        form = form.add_part("images", image_part(&format!("{i}.png"), png(10, 10)));
    }
    let response = app.server.post("/api/batch-process").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json();
    assert!(body.error.contains("Too many images"));
}

#[tokio::test]
async fn test_server_error_body_shape() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/remove-background")
        .multipart(image_form("shoe.png", png(32, 32)))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json();
    assert!(!body.success);
    assert_eq!(body.error, "Failed to process image");
    assert!(body.details.unwrap().contains("local"));
    assert!(body.request_id.is_some_and(|id| !id.is_empty()));
    let timestamp = body.timestamp.unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());

    // Temp files of the failed call were released
    assert!(list_dir(&app.uploads_dir()).is_empty());
    assert!(list_dir(&app.processed_dir()).is_empty());
}

#[tokio::test]
async fn test_unconfigured_cloud_providers() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/remove-background-azure")
        .multipart(image_form("shoe.png", png(32, 32)))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorBody = response.json();
    assert_eq!(body.error, "Failed to process image with Azure");
    assert!(body.details.unwrap().contains("not configured"));

    let response = app
        .server
        .post("/api/remove-background-photoroom")
        .multipart(image_form("shoe.png", png(32, 32)).add_text("mode", "production"))
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_photoroom_rejects_unknown_mode() {
    let app = TestApp::with_config(|builder| builder.photoroom_keys(Some("sandbox".to_string()), None));

    let form = image_form("shoe.png", png(32, 32)).add_text("mode", "staging");
    let response = app.server.post("/api/remove-background-photoroom").multipart(form).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json();
    assert!(body.error.contains("staging"));
}

#[tokio::test]
async fn test_non_image_upload_to_transform_is_a_server_error() {
    let app = TestApp::new();

    let form = image_form("fake.png", gradient(1, 1).as_bytes().to_vec()).add_text("width", "10");
    let response = app.server.post("/api/resize").multipart(form).await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = response.json();
    assert_eq!(body.error, "Failed to resize image");
}
