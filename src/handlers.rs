use actix_multipart::{Multipart, MultipartError};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::{Stream, StreamExt};
use log::{debug, error, info};

use crate::classifier::Verdict;
use crate::error::{ApiError, InferenceError};
use crate::inference::Model;
use crate::models::{HistoriesResponse, PredictResponse, PredictionRecord};
use crate::preprocess;
use crate::store::HistoryStore;

/// Hard bound on the uploaded image, enforced while the stream is read.
pub const MAX_IMAGE_BYTES: usize = 1_000_000;

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const IMAGE_FIELD: &str = "image";

pub async fn predict(
    req: HttpRequest,
    mut payload: Multipart,
    store: web::Data<HistoryStore>,
) -> Result<HttpResponse, ApiError> {
    let buffer = read_image_upload(&mut payload).await?;

    let img = preprocess::decode_rgb(&buffer).map_err(ApiError::Decode)?;
    let input = preprocess::to_model_input(&img);

    let model = req
        .app_data::<web::Data<Model>>()
        .cloned()
        .ok_or(ApiError::Inference(InferenceError::NotLoaded))?;
    let probability = web::block(move || model.predict(&input)).await??;
    debug!("cancer probability: {probability:.4}");

    let verdict = Verdict::from_probability(probability);
    info!("prediction: {}", verdict.label());

    // Persist before responding; the response carries exactly what was saved.
    let record = PredictionRecord::new(verdict);
    let saved = record.clone();
    let store = store.clone();
    web::block(move || store.put(&saved)).await??;

    Ok(HttpResponse::Ok().json(PredictResponse::new(record)))
}

pub async fn histories(store: web::Data<HistoryStore>) -> Result<HttpResponse, ApiError> {
    let store = store.clone();
    let records = web::block(move || store.list_all())
        .await?
        .map_err(|e| {
            error!("history query failed: {e}");
            ApiError::HistoryUnavailable
        })?;

    Ok(HttpResponse::Ok().json(HistoriesResponse::new(records)))
}

/// Reads the `image` multipart field into one in-memory buffer. A disconnect
/// mid-upload surfaces as a stream error here, before any inference or
/// persistence happens.
async fn read_image_upload(payload: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(item) = payload.next().await {
        let mut field = item?;
        if field.name() != IMAGE_FIELD {
            continue;
        }

        let filename = field
            .content_disposition()
            .get_filename()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::BadRequest("No image file provided".to_string()))?;
        validate_extension(&filename)?;

        let buffer = accumulate_bounded(&mut field, MAX_IMAGE_BYTES).await?;
        if buffer.is_empty() {
            return Err(ApiError::BadRequest("No image file provided".to_string()));
        }
        return Ok(buffer);
    }

    Err(ApiError::BadRequest("No image file provided".to_string()))
}

/// Accumulates a chunked byte stream, enforcing the size bound per chunk so
/// an oversized upload is rejected as soon as it crosses the limit.
async fn accumulate_bounded<S>(stream: &mut S, limit: usize) -> Result<Vec<u8>, ApiError>
where
    S: Stream<Item = Result<web::Bytes, MultipartError>> + Unpin,
{
    let mut buffer = Vec::new();
    while let Some(chunk) = stream.next().await {
        let data = chunk?;
        if buffer.len() + data.len() > limit {
            return Err(ApiError::PayloadTooLarge(limit));
        }
        buffer.extend_from_slice(&data);
    }
    Ok(buffer)
}

/// Filename extension check; runs before the decoder ever sees the bytes.
fn validate_extension(filename: &str) -> Result<(), ApiError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ApiError::BadRequest(format!(
            "Unsupported file extension: only .jpg, .jpeg and .png are accepted (got {filename})"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use actix_web::App;
    use futures_util::stream;
    use image::{ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    const BOUNDARY: &str = "abbc761f78ff4d7cb7573b5a23f96ef0";

    fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(32, 32, Rgb([128, 128, 128]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    async fn post_image(
        store: &web::Data<HistoryStore>,
        filename: &str,
        content: &[u8],
    ) -> StatusCode {
        let app = actix_test::init_service(
            App::new()
                .app_data(store.clone())
                .service(web::resource("/predict").route(web::post().to(predict))),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/predict")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart_body(filename, content))
            .to_request();
        actix_test::call_service(&app, req).await.status()
    }

    #[test]
    fn allowed_extensions_pass() {
        assert!(validate_extension("lesion.jpg").is_ok());
        assert!(validate_extension("lesion.jpeg").is_ok());
        assert!(validate_extension("lesion.png").is_ok());
        assert!(validate_extension("LESION.PNG").is_ok());
    }

    #[test]
    fn disallowed_extensions_are_rejected_before_decoding() {
        assert!(validate_extension("lesion.gif").is_err());
        assert!(validate_extension("lesion.bmp").is_err());
        assert!(validate_extension("lesion").is_err());
    }

    #[actix_web::test]
    async fn upload_crossing_the_bound_is_rejected() {
        let chunks: Vec<Result<web::Bytes, MultipartError>> = (0..4)
            .map(|_| Ok(web::Bytes::from(vec![0u8; 300_000])))
            .collect();
        let mut stream = stream::iter(chunks);

        let err = accumulate_bounded(&mut stream, MAX_IMAGE_BYTES)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge(MAX_IMAGE_BYTES)));
    }

    #[actix_web::test]
    async fn upload_at_exactly_the_bound_is_accepted() {
        let chunks: Vec<Result<web::Bytes, MultipartError>> = (0..4)
            .map(|_| Ok(web::Bytes::from(vec![0u8; 250_000])))
            .collect();
        let mut stream = stream::iter(chunks);

        let buffer = accumulate_bounded(&mut stream, MAX_IMAGE_BYTES).await.unwrap();
        assert_eq!(buffer.len(), MAX_IMAGE_BYTES);
    }

    #[actix_web::test]
    async fn non_image_upload_returns_400_and_persists_nothing() {
        let store = web::Data::new(HistoryStore::open_in_memory().unwrap());

        let status = post_image(&store, "lesion.png", b"definitely not an image").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn oversized_upload_returns_413_and_persists_nothing() {
        let store = web::Data::new(HistoryStore::open_in_memory().unwrap());

        let status = post_image(&store, "lesion.png", &vec![0u8; MAX_IMAGE_BYTES + 1]).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn disallowed_extension_returns_400_and_persists_nothing() {
        let store = web::Data::new(HistoryStore::open_in_memory().unwrap());

        let status = post_image(&store, "lesion.gif", &png_bytes()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn missing_model_is_a_server_error_and_persists_nothing() {
        let store = web::Data::new(HistoryStore::open_in_memory().unwrap());

        let status = post_image(&store, "lesion.png", &png_bytes()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn histories_on_empty_store_returns_success_with_empty_data() {
        let store = web::Data::new(HistoryStore::open_in_memory().unwrap());
        let app = actix_test::init_service(
            App::new().app_data(store).service(
                web::resource("/predict/histories").route(web::get().to(histories)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/predict/histories")
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn histories_lists_persisted_records() {
        let store = web::Data::new(HistoryStore::open_in_memory().unwrap());
        let record = PredictionRecord::new(Verdict::Cancer);
        store.put(&record).unwrap();

        let app = actix_test::init_service(
            App::new().app_data(store.clone()).service(
                web::resource("/predict/histories").route(web::get().to(histories)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get()
            .uri("/predict/histories")
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["data"][0]["id"], record.id.as_str());
        assert_eq!(body["data"][0]["history"]["result"], "Cancer");
        assert_eq!(
            body["data"][0]["history"]["suggestion"],
            "Segera periksa ke dokter!"
        );
        assert!(body["data"][0]["history"]["createdAt"].is_string());
    }
}
