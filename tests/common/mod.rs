use std::{
    env,
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use mongodb::Client;

use rentdesk::errors::ApiError;
use rentdesk::models::Invoice;
use rentdesk::pdf::{InvoiceRenderer, invoice_pdf_path};
use rentdesk::state::{AppState, init_state_with_renderer};

/// Global lock so integration tests that mutate the DB run one-at-a-time.
static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

/// Writes a placeholder file where the real renderer would put the PDF,
/// and counts how many times it ran.
pub struct StubRenderer {
    base: PathBuf,
    pub rendered: AtomicUsize,
}

impl StubRenderer {
    pub fn new(base: PathBuf) -> Self {
        StubRenderer {
            base,
            rendered: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.rendered.load(Ordering::SeqCst)
    }
}

impl InvoiceRenderer for StubRenderer {
    fn render(&self, invoice: &Invoice) -> Result<PathBuf, ApiError> {
        let path = invoice_pdf_path(
            &self.base,
            &invoice.month_year,
            &invoice.pg_id,
            &invoice.room_no,
        );
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| ApiError::Render(err.to_string()))?;
        }
        std::fs::write(&path, b"%PDF-1.4 stub").map_err(|err| ApiError::Render(err.to_string()))?;
        self.rendered.fetch_add(1, Ordering::SeqCst);
        Ok(path)
    }
}

/// Always fails, for exercising the render-before-persist ordering.
pub struct FailingRenderer;

impl InvoiceRenderer for FailingRenderer {
    fn render(&self, _invoice: &Invoice) -> Result<PathBuf, ApiError> {
        Err(ApiError::Render("renderer unavailable".into()))
    }
}

pub struct TestContext {
    pub state: AppState,
    pub db_name: String,
    pub invoice_dir: PathBuf,
    /// Present when the context was built with the stub renderer.
    pub renderer: Option<Arc<StubRenderer>>,
    _guard: MutexGuard<'static, ()>,
}

pub async fn setup_state() -> Option<TestContext> {
    let dir = std::env::temp_dir().join(format!("rentdesk-test-invoices-{}", millis()));
    let renderer = Arc::new(StubRenderer::new(dir.clone()));
    let mut ctx = setup_state_with(renderer.clone(), dir).await?;
    ctx.renderer = Some(renderer);
    Some(ctx)
}

pub async fn setup_state_failing_renderer() -> Option<TestContext> {
    let dir = std::env::temp_dir().join(format!("rentdesk-test-invoices-{}", millis()));
    setup_state_with(Arc::new(FailingRenderer), dir).await
}

async fn setup_state_with(
    renderer: Arc<dyn InvoiceRenderer>,
    invoice_dir: PathBuf,
) -> Option<TestContext> {
    let guard = TEST_DB_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("failed to lock test db mutex");

    let uri = env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = format!("rentdesktest_{}", millis());
    unsafe {
        env::set_var("MONGODB_DB", &db_name);
    }

    let client = match Client::with_uri_str(&uri).await {
        Ok(c) => c,
        Err(err) => {
            eprintln!("Skipping test; cannot connect to MongoDB: {err:?}");
            drop(guard);
            return None;
        }
    };
    if let Err(err) = client.database(&db_name).drop().await {
        eprintln!("Skipping test; cannot drop test DB: {err:?}");
        drop(guard);
        return None;
    }

    match init_state_with_renderer(renderer).await {
        Ok(state) => Some(TestContext {
            state,
            db_name,
            invoice_dir,
            renderer: None,
            _guard: guard,
        }),
        Err(err) => {
            eprintln!("Skipping test; init_state failed: {err:?}");
            drop(guard);
            None
        }
    }
}

pub async fn teardown(ctx: Option<TestContext>) {
    if let Some(ctx) = ctx {
        let uri =
            env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        if let Ok(client) = Client::with_uri_str(&uri).await {
            let _ = client.database(&ctx.db_name).drop().await;
        }
        let _ = std::fs::remove_dir_all(&ctx.invoice_dir);
        drop(ctx);
    }
}

fn millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis()
}
