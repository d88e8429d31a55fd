//! Executing facade over `PdfClient`.
//!
//! # Design
//! `PdfApi` owns a client, a transport and a notifier, all injected at
//! construction; there is no process-wide instance. Each method builds a
//! request, passes it through the request interceptor, executes it and
//! parses the response. Any failure is intercepted exactly once: logged,
//! turned into a notification, then returned unchanged so the call site can
//! react too. Nothing is retried.

use serde_json::Value;
use uuid::Uuid;

use crate::client::PdfClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::multipart::UploadFile;
use crate::notify::{LogNotifier, Notifier};
use crate::progress::UploadProgress;
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    CasePages, CreateTemplate, DefaultConfig, MessageResponse, PageDetail, PdfCase, ProcessConfig,
    Template, UpdateCase, UpdateTemplate,
};

pub struct PdfApi<T, N> {
    client: PdfClient,
    transport: T,
    notifier: N,
}

impl PdfApi<UreqTransport, LogNotifier> {
    /// Blocking HTTP transport, notifications as log events.
    pub fn from_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(&config);
        Self::new(PdfClient::with_config(config), transport, LogNotifier)
    }
}

impl<T: Transport, N: Notifier> PdfApi<T, N> {
    pub fn new(client: PdfClient, transport: T, notifier: N) -> Self {
        Self {
            client,
            transport,
            notifier,
        }
    }

    pub fn client(&self) -> &PdfClient {
        &self.client
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Outgoing requests pass through unchanged.
    fn intercept_request(&self, request: HttpRequest) -> HttpRequest {
        tracing::debug!(
            method = request.method.as_str(),
            url = %request.path,
            "sending request"
        );
        request
    }

    fn intercept_error(&self, err: ApiError) -> ApiError {
        let message = err.message();
        tracing::error!(category = ?err.category(), error = %err, "API error");
        self.notifier.notify_error(&message);
        err
    }

    fn exchange<R>(
        &self,
        request: Result<HttpRequest, ApiError>,
        on_progress: &mut dyn FnMut(UploadProgress),
        parse: impl FnOnce(&PdfClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let result = request.and_then(|request| {
            let request = self.intercept_request(request);
            let response = self.transport.execute(request, on_progress)?;
            parse(&self.client, response)
        });
        result.map_err(|err| self.intercept_error(err))
    }

    fn call<R>(
        &self,
        request: Result<HttpRequest, ApiError>,
        parse: impl FnOnce(&PdfClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        self.exchange(request, &mut |_| {}, parse)
    }

    pub fn upload_pdf(
        &self,
        file: &UploadFile,
        mut on_progress: impl FnMut(UploadProgress),
    ) -> Result<PdfCase, ApiError> {
        let request = Ok(self.client.build_upload_pdf(file));
        self.exchange(request, &mut on_progress, PdfClient::parse_upload)
    }

    pub fn upload_pdf_with_config(
        &self,
        file: &UploadFile,
        config: Option<&ProcessConfig>,
        mut on_progress: impl FnMut(UploadProgress),
    ) -> Result<PdfCase, ApiError> {
        let request = self.client.build_upload_pdf_with_config(file, config);
        self.exchange(request, &mut on_progress, PdfClient::parse_upload)
    }

    pub fn get_cases(&self) -> Result<Vec<PdfCase>, ApiError> {
        self.call(Ok(self.client.build_get_cases()), PdfClient::parse_get_cases)
    }

    pub fn get_case(&self, id: Uuid) -> Result<PdfCase, ApiError> {
        self.call(Ok(self.client.build_get_case(id)), PdfClient::parse_get_case)
    }

    pub fn update_case(&self, id: Uuid, data: &UpdateCase) -> Result<PdfCase, ApiError> {
        self.call(self.client.build_update_case(id, data), PdfClient::parse_update_case)
    }

    pub fn reprocess_case(
        &self,
        id: Uuid,
        config: Option<&ProcessConfig>,
    ) -> Result<MessageResponse, ApiError> {
        self.call(
            self.client.build_reprocess_case(id, config),
            PdfClient::parse_reprocess_case,
        )
    }

    pub fn delete_case(&self, id: Uuid) -> Result<MessageResponse, ApiError> {
        self.call(Ok(self.client.build_delete_case(id)), PdfClient::parse_delete_case)
    }

    pub fn export_case(&self, id: Uuid) -> Result<Value, ApiError> {
        self.call(Ok(self.client.build_export_case(id)), PdfClient::parse_export_case)
    }

    pub fn get_case_pages(&self, id: Uuid) -> Result<CasePages, ApiError> {
        self.call(Ok(self.client.build_get_case_pages(id)), PdfClient::parse_get_case_pages)
    }

    pub fn get_case_page(&self, id: Uuid, page_num: u32) -> Result<PageDetail, ApiError> {
        self.call(
            Ok(self.client.build_get_case_page(id, page_num)),
            PdfClient::parse_get_case_page,
        )
    }

    pub fn get_templates(&self) -> Result<Vec<Template>, ApiError> {
        self.call(Ok(self.client.build_get_templates()), PdfClient::parse_get_templates)
    }

    pub fn create_template(&self, input: &CreateTemplate) -> Result<Template, ApiError> {
        self.call(self.client.build_create_template(input), PdfClient::parse_template)
    }

    pub fn get_template(&self, id: Uuid) -> Result<Template, ApiError> {
        self.call(Ok(self.client.build_get_template(id)), PdfClient::parse_template)
    }

    pub fn update_template(&self, id: Uuid, input: &UpdateTemplate) -> Result<Template, ApiError> {
        self.call(self.client.build_update_template(id, input), PdfClient::parse_template)
    }

    pub fn delete_template(&self, id: Uuid) -> Result<MessageResponse, ApiError> {
        self.call(Ok(self.client.build_delete_template(id)), PdfClient::parse_delete_template)
    }

    pub fn get_default_config(&self) -> Result<DefaultConfig, ApiError> {
        self.call(
            Ok(self.client.build_get_default_config()),
            PdfClient::parse_get_default_config,
        )
    }

    /// Full response; see `HttpResponse::attachment_filename`.
    pub fn export_all_cases_excel(&self) -> Result<HttpResponse, ApiError> {
        self.call(
            Ok(self.client.build_export_all_cases_excel()),
            PdfClient::parse_export_all_cases_excel,
        )
    }

    pub fn clear_all_cases(&self) -> Result<MessageResponse, ApiError> {
        self.call(Ok(self.client.build_clear_all_cases()), PdfClient::parse_clear_all_cases)
    }
}
