//! Platform seam the drivers run against.
//!
//! `PlatformClient` is the production implementation; tests substitute an
//! in-memory platform.

use idbridge_engine::form::FormSpec;
use idbridge_engine::model::{Account, FormDefinition, FormInstance, Identity, Source, Workflow};
use idbridge_engine::review::ReviewState;
use idbridge_platform::types::{
    Email, FormInstanceRequest, PreviewRequest, PreviewResponse, TransformRead, TransformSpec,
    WorkflowRequest,
};
use idbridge_platform::{PlatformClient, PlatformError};

pub trait IdentityPlatform {
    fn list_identities(&self) -> Result<Vec<Identity>, PlatformError>;
    fn get_source(&self, id: &str) -> Result<Source, PlatformError>;

    fn list_accounts_on_source(&self, source_id: &str) -> Result<Vec<Account>, PlatformError>;
    fn list_uncorrelated_accounts(&self) -> Result<Vec<Account>, PlatformError>;
    fn correlate_account(
        &self,
        account_id: &str,
        identity_id: &str,
    ) -> Result<Account, PlatformError>;

    fn list_form_definitions(&self) -> Result<Vec<FormDefinition>, PlatformError>;
    fn create_form_definition(&self, form: &FormSpec) -> Result<FormDefinition, PlatformError>;
    fn delete_form_definition(&self, id: &str) -> Result<(), PlatformError>;

    fn list_form_instances(&self) -> Result<Vec<FormInstance>, PlatformError>;
    fn create_form_instance(
        &self,
        request: &FormInstanceRequest,
    ) -> Result<FormInstance, PlatformError>;
    fn set_form_instance_state(
        &self,
        id: &str,
        state: ReviewState,
    ) -> Result<FormInstance, PlatformError>;

    fn list_workflows(&self) -> Result<Vec<Workflow>, PlatformError>;
    fn create_workflow(&self, request: &WorkflowRequest) -> Result<Workflow, PlatformError>;
    fn send_email(&self, workflow_id: &str, email: &Email) -> Result<(), PlatformError>;

    fn list_transforms(&self) -> Result<Vec<TransformRead>, PlatformError>;
    fn create_transform(&self, spec: &TransformSpec) -> Result<TransformRead, PlatformError>;
    fn preview_identity(&self, request: &PreviewRequest) -> Result<PreviewResponse, PlatformError>;
}

impl IdentityPlatform for PlatformClient {
    fn list_identities(&self) -> Result<Vec<Identity>, PlatformError> {
        PlatformClient::list_identities(self)
    }

    fn get_source(&self, id: &str) -> Result<Source, PlatformError> {
        PlatformClient::get_source(self, id)
    }

    fn list_accounts_on_source(&self, source_id: &str) -> Result<Vec<Account>, PlatformError> {
        let filters = format!("sourceId eq \"{source_id}\"");
        self.list_accounts(Some(&filters))
    }

    fn list_uncorrelated_accounts(&self) -> Result<Vec<Account>, PlatformError> {
        PlatformClient::list_uncorrelated_accounts(self)
    }

    fn correlate_account(
        &self,
        account_id: &str,
        identity_id: &str,
    ) -> Result<Account, PlatformError> {
        PlatformClient::correlate_account(self, account_id, identity_id)
    }

    fn list_form_definitions(&self) -> Result<Vec<FormDefinition>, PlatformError> {
        PlatformClient::list_form_definitions(self)
    }

    fn create_form_definition(&self, form: &FormSpec) -> Result<FormDefinition, PlatformError> {
        PlatformClient::create_form_definition(self, form)
    }

    fn delete_form_definition(&self, id: &str) -> Result<(), PlatformError> {
        PlatformClient::delete_form_definition(self, id)
    }

    fn list_form_instances(&self) -> Result<Vec<FormInstance>, PlatformError> {
        PlatformClient::list_form_instances(self)
    }

    fn create_form_instance(
        &self,
        request: &FormInstanceRequest,
    ) -> Result<FormInstance, PlatformError> {
        PlatformClient::create_form_instance(self, request)
    }

    fn set_form_instance_state(
        &self,
        id: &str,
        state: ReviewState,
    ) -> Result<FormInstance, PlatformError> {
        PlatformClient::set_form_instance_state(self, id, state)
    }

    fn list_workflows(&self) -> Result<Vec<Workflow>, PlatformError> {
        PlatformClient::list_workflows(self)
    }

    fn create_workflow(&self, request: &WorkflowRequest) -> Result<Workflow, PlatformError> {
        PlatformClient::create_workflow(self, request)
    }

    fn send_email(&self, workflow_id: &str, email: &Email) -> Result<(), PlatformError> {
        self.test_workflow(workflow_id, email)
    }

    fn list_transforms(&self) -> Result<Vec<TransformRead>, PlatformError> {
        PlatformClient::list_transforms(self)
    }

    fn create_transform(&self, spec: &TransformSpec) -> Result<TransformRead, PlatformError> {
        PlatformClient::create_transform(self, spec)
    }

    fn preview_identity(&self, request: &PreviewRequest) -> Result<PreviewResponse, PlatformError> {
        PlatformClient::preview_identity(self, request)
    }
}
