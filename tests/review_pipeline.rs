//! End-to-end review pipeline tests against scripted providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ideaforge::crew::{
    CrewConfig, CrewError, Domain, DomainRegistry, ReviewOptions, ReviewService, RunInputs, Tier,
};
use ideaforge::llm::{Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage};
use ideaforge::store::{FieldUpdate, MemoryStore, NewProject, ProjectStatus, ProjectStore};
use ideaforge::LlmError;

/// How the scripted provider answers.
#[derive(Clone, Copy)]
enum Reply {
    /// `<role>-OUT`
    RoleOut,
    /// `<role>: reviewed '<first 20 chars of instruction>'`
    Echo,
}

struct ScriptedProvider {
    reply: Reply,
    configured: bool,
    fail_on_call: Option<usize>,
    call_count: AtomicUsize,
    roles: Mutex<Vec<String>>,
    instructions: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            configured: true,
            fail_on_call: None,
            call_count: AtomicUsize::new(0),
            roles: Mutex::new(Vec::new()),
            instructions: Mutex::new(Vec::new()),
        }
    }

    fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(Reply::RoleOut)
        }
    }

    fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new(Reply::RoleOut)
        }
    }

    fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn roles(&self) -> Vec<String> {
        self.roles.lock().expect("lock not poisoned").clone()
    }

    fn instruction(&self, call: usize) -> String {
        self.instructions.lock().expect("lock not poisoned")[call].clone()
    }
}

/// Role named on the first line of the system preamble: `You are the <role>.`
fn role_of(request: &GenerationRequest) -> String {
    request.messages[0]
        .content
        .lines()
        .next()
        .and_then(|l| l.strip_prefix("You are the "))
        .and_then(|l| l.strip_suffix('.'))
        .unwrap_or("unknown")
        .to_string()
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        let role = role_of(&request);
        let instruction = request.messages[1].content.clone();

        self.roles.lock().expect("lock not poisoned").push(role.clone());
        self.instructions
            .lock()
            .expect("lock not poisoned")
            .push(instruction.clone());

        if self.fail_on_call == Some(idx) {
            return Err(LlmError::RateLimited("quota exhausted".to_string()));
        }

        let content = match self.reply {
            Reply::RoleOut => format!("{}-OUT", role),
            Reply::Echo => {
                let head: String = instruction.chars().take(20).collect();
                format!("{}: reviewed '{}'", role, head)
            }
        };

        Ok(GenerationResponse {
            id: format!("mock-{}", idx),
            model: "mock-model".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(content),
                finish_reason: "stop".to_string(),
            }],
            usage: Usage::default(),
        })
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

fn service_with(provider: &Arc<ScriptedProvider>) -> (ReviewService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = ReviewService::new(provider.clone(), store.clone(), CrewConfig::default());
    (service, store)
}

fn all_pairs() -> Vec<(Domain, Tier)> {
    Domain::all()
        .into_iter()
        .flat_map(|d| [(d, Tier::Macro), (d, Tier::Micro)])
        .collect()
}

#[tokio::test]
async fn every_pair_calls_once_per_step_and_returns_a_report() {
    let registry = DomainRegistry::with_catalog();

    for (domain, tier) in all_pairs() {
        let provider = Arc::new(ScriptedProvider::new(Reply::RoleOut));
        let (service, _) = service_with(&provider);
        let expected_steps = registry.get(domain, tier).unwrap().plan(None).len();

        let body = service
            .run(
                domain.as_str(),
                tier.as_str(),
                RunInputs::new("Some idea worth reviewing").with_context("Macro notes"),
            )
            .await
            .unwrap();

        assert!(!body.trim().is_empty(), "{} / {}", domain, tier);
        assert_eq!(provider.calls(), expected_steps, "{} / {}", domain, tier);
    }
}

#[tokio::test]
async fn consolidation_step_receives_dependencies_in_declared_order() {
    let provider = Arc::new(ScriptedProvider::new(Reply::RoleOut));
    let (service, _) = service_with(&provider);

    service
        .run_with(
            Domain::DigitalProduct,
            Tier::Micro,
            RunInputs::new("Onboarding flow with three screens"),
            &ReviewOptions::default(),
        )
        .await
        .unwrap();

    let consolidation = provider.instruction(3);
    let a = consolidation.find("UX Specialist-OUT").unwrap();
    let b = consolidation.find("Systems & QA Engineer-OUT").unwrap();
    let c = consolidation.find("Ethics Auditor-OUT").unwrap();
    assert!(a < b && b < c);
}

#[tokio::test]
async fn identical_inputs_give_identical_report_content() {
    let provider = Arc::new(ScriptedProvider::new(Reply::RoleOut));
    let (service, store) = service_with(&provider);
    let project = store
        .create_project(NewProject::new("ana@x.io", "Dune Clone", Domain::History))
        .await
        .unwrap();
    store
        .update_field(
            project.id,
            FieldUpdate::Text {
                tier: Tier::Macro,
                text: "A desert world with no water magic".to_string(),
            },
        )
        .await
        .unwrap();

    let first = service
        .review_project(project.id, Tier::Macro, &ReviewOptions::default())
        .await
        .unwrap();
    let second = service
        .review_project(project.id, Tier::Macro, &ReviewOptions::default())
        .await
        .unwrap();

    assert_eq!(first.content, second.content);
    let stored = store.require_project(project.id).await.unwrap();
    assert_eq!(stored.reports_macro.len(), 2);
}

#[tokio::test]
async fn unconfigured_provider_fails_fast_with_zero_calls() {
    let provider = Arc::new(ScriptedProvider::unconfigured());
    let (service, _) = service_with(&provider);

    for (domain, tier) in all_pairs() {
        let result = service
            .run(domain.as_str(), tier.as_str(), RunInputs::new("text"))
            .await;
        assert!(matches!(result, Err(CrewError::Configuration(_))));
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn step_failure_aborts_and_stores_nothing() {
    let provider = Arc::new(ScriptedProvider::failing_on(1));
    let (service, store) = service_with(&provider);
    let project = store
        .create_project(NewProject::new("ana@x.io", "Saga", Domain::History))
        .await
        .unwrap();
    store
        .update_field(
            project.id,
            FieldUpdate::Text {
                tier: Tier::Macro,
                text: "Two moons, one tide".to_string(),
            },
        )
        .await
        .unwrap();

    let result = service
        .review_project(project.id, Tier::Macro, &ReviewOptions::default())
        .await;

    match result {
        Err(CrewError::StepFailed { index, role, source }) => {
            assert_eq!(index, 1);
            assert_eq!(role, "Character Psychologist");
            assert!(matches!(source, LlmError::RateLimited(_)));
        }
        other => panic!("expected StepFailed, got {:?}", other),
    }
    assert_eq!(provider.calls(), 2);

    let stored = store.require_project(project.id).await.unwrap();
    assert!(stored.reports_macro.is_empty());
    assert_eq!(stored.status, ProjectStatus::Draft);
}

#[tokio::test]
async fn unknown_domain_is_never_defaulted() {
    let provider = Arc::new(ScriptedProvider::new(Reply::RoleOut));
    let (service, _) = service_with(&provider);

    let result = service
        .run("unknown-domain", "macro", RunInputs::new("text"))
        .await;

    match result {
        Err(CrewError::UnsupportedCombination { domain, tier }) => {
            assert_eq!(domain, "unknown-domain");
            assert_eq!(tier, "macro");
        }
        other => panic!("expected UnsupportedCombination, got {:?}", other),
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn dune_clone_report_has_one_section_per_critic_in_order() {
    let provider = Arc::new(ScriptedProvider::new(Reply::Echo));
    let (service, _) = service_with(&provider);

    let body = service
        .run(
            "history",
            "macro",
            RunInputs::new("A desert world with no water magic").with_title("Dune Clone"),
        )
        .await
        .unwrap();

    let roles = [
        "Structural Critic",
        "Character Psychologist",
        "Literary Market Agent",
    ];
    let positions: Vec<usize> = roles
        .iter()
        .map(|role| body.find(&format!("## {}\n\n{}: reviewed '", role, role)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(body.matches("## ").count(), 3);
    assert_eq!(provider.roles(), roles);
}

#[tokio::test]
async fn dune_clone_with_consolidation_returns_editor_output_only() {
    let provider = Arc::new(ScriptedProvider::new(Reply::Echo));
    let (service, _) = service_with(&provider);

    let outcome = service
        .run_with(
            Domain::History,
            Tier::Macro,
            RunInputs::new("A desert world with no water magic").with_title("Dune Clone"),
            &ReviewOptions::new().with_consolidate(true),
        )
        .await
        .unwrap();

    assert_eq!(outcome.steps.len(), 4);
    assert!(outcome.body.starts_with("Editor-in-Chief: reviewed '"));
    assert!(!outcome.body.contains("## "));
    assert!(provider.instruction(3).contains("Dune Clone"));
}

#[tokio::test]
async fn concurrent_runs_share_nothing() {
    let provider = Arc::new(ScriptedProvider::new(Reply::RoleOut));
    let (service, _) = service_with(&provider);
    let service = Arc::new(service);

    let macro_run = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .run("physical-venture", "macro", RunInputs::new("A bakery"))
                .await
        })
    };
    let micro_run = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .run("physical-venture", "micro", RunInputs::new("Oven layout"))
                .await
        })
    };

    let macro_body = macro_run.await.unwrap().unwrap();
    let micro_body = micro_run.await.unwrap().unwrap();
    assert_eq!(macro_body, "New-Business Director-OUT");
    assert_eq!(micro_body, "General Manager-OUT");
    assert_eq!(provider.calls(), 8);
}
