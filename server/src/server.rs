use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::{get, web, App, HttpResponse, HttpServer};
use futures_util::TryStreamExt;
use serde_json::json;

use crate::{error::ApiError, state::AppState};

#[get("/")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Background Removal API is running",
        "model_loaded": state.weights_loaded,
        "device": state.device_name,
    }))
}

/// Pulls the `file` field out of a multipart payload, enforcing the image
/// content-type gate before reading any body bytes.
async fn read_image_field(mut payload: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::BadUpload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|mime| mime.essence_str().starts_with("image/"));
        if !is_image {
            return Err(ApiError::NotAnImage);
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(str::to_owned))
            .unwrap_or_else(|| "image".to_owned());

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| ApiError::BadUpload(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
        }

        return Ok((filename, bytes));
    }

    Err(ApiError::MissingFile)
}

/// Removes the background from the uploaded image and returns the RGBA
/// result as PNG. Bound at both `/remove-background` and
/// `/remove-background-preview`.
///
/// Inference runs on the blocking thread pool so a slow forward pass
/// never stalls the event loop, and is cut off by the configured timeout.
pub async fn remove_background(
    payload: Multipart,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (filename, bytes) = read_image_field(payload).await?;
    log::info!("processing upload: {filename} ({} bytes)", bytes.len());

    let extractor = state.extractor.clone();
    let result = tokio::time::timeout(
        state.inference_timeout,
        web::block(move || extractor.extract(&bytes)),
    )
    .await
    .map_err(|_| ApiError::Timeout)?
    .map_err(|e| ApiError::Processing(e.to_string()))??;

    let png = u2net_extractor::encode_png(&result)?;
    log::info!("successfully processed {filename}");

    Ok(HttpResponse::Ok()
        .content_type("image/png")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=removed_bg_{filename}"),
        ))
        .body(png))
}

pub async fn startup(host: String, port: u16, state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(state);

    log::info!("starting server at {host}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(Cors::permissive())
            .app_data(app_state.clone())
            .service(health)
            .service(web::resource("/remove-background").route(web::post().to(remove_background)))
            .service(
                web::resource("/remove-background-preview")
                    .route(web::post().to(remove_background)),
            )
    })
    .bind((host, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, sync::Arc, time::Duration};

    use actix_web::{http::StatusCode, test};
    use burn::prelude::*;
    use image::{Rgb, RgbImage};
    use u2net_extractor::{
        backend::SelectedBackend, BackgroundExtractor, SalientObjectModel,
    };

    use super::*;

    /// Saliency rises left to right, independent of the image content.
    struct GradientModel;

    impl SalientObjectModel<SelectedBackend> for GradientModel {
        fn predict(&self, input: Tensor<SelectedBackend, 4>) -> [Tensor<SelectedBackend, 4>; 7] {
            let [_, _, height, width] = input.dims();
            let values: Vec<f32> = (0..height * width)
                .map(|i| (i % width) as f32 / width as f32)
                .collect();
            let map: Tensor<SelectedBackend, 4> = Tensor::from_data(
                TensorData::new(values, [1, 1, height, width]),
                &Default::default(),
            );
            std::array::from_fn(|_| map.clone())
        }
    }

    fn test_state() -> AppState {
        AppState {
            extractor: Arc::new(BackgroundExtractor::new(
                Box::new(GradientModel),
                Default::default(),
            )),
            weights_loaded: false,
            device_name: "NdArray (CPU)",
            inference_timeout: Duration::from_secs(30),
        }
    }

    fn multipart_body(content_type: &str, payload: &[u8]) -> (String, Vec<u8>) {
        let boundary = "----test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"photo.png\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        (format!("multipart/form-data; boundary={boundary}"), body)
    }

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([40, 80, 120]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    macro_rules! test_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(test_state()))
                    .service(health)
                    .service(
                        web::resource("/remove-background")
                            .route(web::post().to(remove_background)),
                    )
                    .service(
                        web::resource("/remove-background-preview")
                            .route(web::post().to(remove_background)),
                    ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn health_reports_degraded_mode() {
        let app = test_app!();

        let body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request())
                .await;

        assert_eq!(body["model_loaded"], serde_json::Value::Bool(false));
        assert_eq!(body["device"], "NdArray (CPU)");
        assert!(body["message"].as_str().unwrap().contains("running"));
    }

    #[actix_web::test]
    async fn non_image_content_type_is_rejected_before_decoding() {
        let app = test_app!();
        let (content_type, body) = multipart_body("text/plain", b"hello");

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/remove-background")
                .insert_header(("content-type", content_type))
                .set_payload(body)
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn undecodable_image_bytes_are_a_client_error() {
        let app = test_app!();
        let (content_type, body) = multipart_body("image/png", b"not really a png");

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/remove-background")
                .insert_header(("content-type", content_type))
                .set_payload(body)
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn missing_file_field_is_rejected() {
        let app = test_app!();
        let boundary = "----test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nx\r\n--{boundary}--\r\n"
        );

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/remove-background")
                .insert_header((
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                ))
                .set_payload(body)
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn upload_returns_png_at_original_dimensions() {
        let app = test_app!();
        let (content_type, body) = multipart_body("image/png", &png_fixture(40, 30));

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/remove-background")
                .insert_header(("content-type", content_type))
                .set_payload(body)
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "image/png"
        );
        assert!(resp
            .headers()
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("removed_bg_photo.png"));

        let bytes = test::read_body(resp).await;
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[actix_web::test]
    async fn preview_endpoint_behaves_identically() {
        let app = test_app!();
        let (content_type, body) = multipart_body("image/png", &png_fixture(16, 16));

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/remove-background-preview")
                .insert_header(("content-type", content_type))
                .set_payload(body)
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "image/png"
        );
    }
}
