//! The Extract → Edit → Render → Apply session state machine.
//!
//! A [`Session`] is sans-IO. Each network step is split in two: a
//! `begin`/`request` call hands out a [`Ticket`] holding the request body
//! and a generation number, and a `complete` call accepts the
//! collaborator's response for that generation. Responses whose
//! generation no longer matches the pending request (the session was
//! cancelled, or the request was re-issued) are reported as
//! [`Delivery::Stale`] and dropped without touching any state.
//!
//! ```text
//! Extract ──ok──▶ Edit ──request_apply──▶ Render ──ok──▶ Apply ──apply──▶ Done
//!    │  └─err─▶ Failed   ▲    │                 │                │
//!    │                   └────┼─────err─────────┘                └─err─▶ Apply
//!    └───────cancel──────────▶ Cancelled
//! ```

use std::fmt;

use web_time::{SystemTime, UNIX_EPOCH};

use crate::config::SessionConfig;
use crate::coords::CoordinateMapper;
use crate::graph::KeypointGraph;
use crate::scene::{HostScene, NodeId, Placement, Provenance, SceneNode};
use crate::surface::EditSurface;
use crate::types::{Action, Dimensions, PoseDocument, RenderedImage, SessionError, Stage};
use crate::wire::{self, DetectRequest, DetectResponse, PoseData, RenderRequest, RenderResponse};

/// The image being annotated, as it sits in the host scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    bytes: Vec<u8>,
    dimensions: Dimensions,
    placement: Placement,
}

impl SourceImage {
    /// Wrap an encoded bitmap, reading its dimensions from the header.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] if the bitmap cannot be
    /// measured or has a zero-length axis.
    pub fn new(bytes: Vec<u8>, placement: Placement) -> Result<Self, SessionError> {
        let dimensions = wire::measure_bitmap(&bytes)
            .map_err(|e| SessionError::Configuration(format!("source image: {e}")))?;
        Self::with_dimensions(bytes, dimensions, placement)
    }

    /// Wrap an encoded bitmap whose dimensions are already known.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] if `dimensions` has a
    /// zero-length axis.
    pub fn with_dimensions(
        bytes: Vec<u8>,
        dimensions: Dimensions,
        placement: Placement,
    ) -> Result<Self, SessionError> {
        if dimensions.is_degenerate() {
            return Err(SessionError::Configuration(format!(
                "source image has a zero-length axis ({dimensions})"
            )));
        }
        Ok(Self {
            bytes,
            dimensions,
            placement,
        })
    }

    /// Encoded bitmap bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Pixel dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Placement of the source node in the host scene.
    #[must_use]
    pub const fn placement(&self) -> Placement {
        self.placement
    }
}

/// Request generation number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    /// Raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A request to send to a collaborator, stamped with its generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket<R> {
    /// Pass back unchanged with the response.
    pub generation: Generation,
    /// Request body.
    pub request: R,
}

/// Outcome of handing a response back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The response was for the pending request and has been applied.
    Accepted,
    /// The response was for an earlier or abandoned request and was
    /// dropped.
    Stale,
}

/// What a finished session hands to its completion callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// The document exactly as extracted.
    pub original_document: PoseDocument,
    /// The document that was rendered.
    pub modified_document: PoseDocument,
    /// The rendered image that was placed.
    pub rendered_image: RenderedImage,
    /// Id of the placed node.
    pub node: NodeId,
}

#[derive(Debug)]
struct Editing {
    original: PoseDocument,
    surface: EditSurface,
}

#[derive(Debug)]
enum State {
    Extract,
    Edit(Box<Editing>),
    Render {
        editing: Box<Editing>,
        frozen: PoseDocument,
    },
    Apply {
        editing: Box<Editing>,
        frozen: PoseDocument,
        rendered: RenderedImage,
    },
    Done {
        original: PoseDocument,
        modified: PoseDocument,
    },
    Cancelled,
    Failed(SessionError),
}

impl State {
    const fn stage(&self) -> Stage {
        match self {
            Self::Extract => Stage::Extract,
            Self::Edit(_) => Stage::Edit,
            Self::Render { .. } => Stage::Render,
            Self::Apply { .. } => Stage::Apply,
            Self::Done { .. } => Stage::Done,
            Self::Cancelled => Stage::Cancelled,
            Self::Failed(_) => Stage::Failed,
        }
    }
}

type CompletionCallback = Box<dyn FnOnce(Completion)>;

/// One editing session over one source image.
pub struct Session {
    config: SessionConfig,
    source: SourceImage,
    mapper: CoordinateMapper,
    state: State,
    generation: u64,
    pending: Option<u64>,
    on_complete: Option<CompletionCallback>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("source", &self.source.dimensions)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session in the [`Stage::Extract`] stage.
    ///
    /// The display frame is fixed here and never changes.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Configuration`] if the display bound is
    /// not positive.
    pub fn new(config: SessionConfig, source: SourceImage) -> Result<Self, SessionError> {
        let mapper = CoordinateMapper::fit(source.dimensions, config.editor.max_display_side)?;
        tracing::info!(
            source = %source.dimensions,
            display_width = mapper.display().width,
            display_height = mapper.display().height,
            "session created"
        );
        Ok(Self {
            config,
            source,
            mapper,
            state: State::Extract,
            generation: 0,
            pending: None,
            on_complete: None,
        })
    }

    /// Register a callback invoked once the rendered image is placed.
    #[must_use]
    pub fn with_completion(mut self, callback: impl FnOnce(Completion) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.state.stage()
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The source image.
    #[must_use]
    pub const fn source(&self) -> &SourceImage {
        &self.source
    }

    /// The session's coordinate mapper.
    #[must_use]
    pub const fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// The detection error that ended the session, if it failed.
    #[must_use]
    pub const fn failure(&self) -> Option<&SessionError> {
        match &self.state {
            State::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Build the detection request.
    ///
    /// Calling this again while a detection is pending re-issues it; the
    /// earlier ticket becomes stale.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] outside the extract
    /// stage.
    pub fn begin_extract(&mut self) -> Result<Ticket<DetectRequest>, SessionError> {
        self.expect_stage(Action::Extract, Stage::Extract)?;
        let request = DetectRequest {
            processor: self.config.processor.clone(),
            image: wire::encode_bitmap(&self.source.bytes),
            parameters: self.config.detector,
        };
        let generation = self.issue();
        tracing::info!(%generation, processor = %request.processor, "extract requested");
        Ok(Ticket {
            generation,
            request,
        })
    }

    /// Accept the detection collaborator's answer.
    ///
    /// `response` is `Err` when the collaborator could not be reached.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Detection`] when the collaborator failed,
    /// the response is malformed, or nobody was detected. The session is
    /// then in [`Stage::Failed`].
    pub fn complete_extract<E: fmt::Display>(
        &mut self,
        generation: Generation,
        response: Result<DetectResponse, E>,
    ) -> Result<Delivery, SessionError> {
        if !self.accept(generation, Stage::Extract) {
            return Ok(Delivery::Stale);
        }

        match detect_document(response) {
            Ok(document) => {
                tracing::info!(
                    people = document.people.len(),
                    keypoints = document.keypoint_count(),
                    "extract succeeded"
                );
                let graph = KeypointGraph::new(document.clone(), self.source.dimensions);
                self.state = State::Edit(Box::new(Editing {
                    original: document,
                    surface: EditSurface::new(graph, self.mapper),
                }));
                Ok(Delivery::Accepted)
            }
            Err(message) => {
                let err = SessionError::Detection(message);
                tracing::warn!(error = %err, "extract failed");
                self.state = State::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// The edit surface. Only available in the edit stage.
    #[must_use]
    pub fn surface(&self) -> Option<&EditSurface> {
        match &self.state {
            State::Edit(editing) => Some(&editing.surface),
            _ => None,
        }
    }

    /// The edit surface for pointer events. Only available in the edit
    /// stage.
    pub fn surface_mut(&mut self) -> Option<&mut EditSurface> {
        match &mut self.state {
            State::Edit(editing) => Some(&mut editing.surface),
            _ => None,
        }
    }

    /// The document as it currently stands (edited, frozen or final).
    #[must_use]
    pub fn current_document(&self) -> Option<&PoseDocument> {
        match &self.state {
            State::Edit(editing) => Some(editing.surface.graph().document()),
            State::Render { frozen, .. } | State::Apply { frozen, .. } => Some(frozen),
            State::Done { modified, .. } => Some(modified),
            State::Extract | State::Cancelled | State::Failed(_) => None,
        }
    }

    /// The document exactly as extracted.
    #[must_use]
    pub fn original_document(&self) -> Option<&PoseDocument> {
        match &self.state {
            State::Edit(editing)
            | State::Render { editing, .. }
            | State::Apply { editing, .. } => Some(&editing.original),
            State::Done { original, .. } => Some(original),
            State::Extract | State::Cancelled | State::Failed(_) => None,
        }
    }

    /// Discard every edit and reload the extracted document.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] outside the edit stage.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        let State::Edit(editing) = &mut self.state else {
            return Err(self.invalid(Action::Reset));
        };
        let graph = KeypointGraph::new(editing.original.clone(), self.source.dimensions);
        editing.surface = EditSurface::new(graph, self.mapper);
        tracing::info!("edits reset");
        Ok(())
    }

    /// Abandon the session.
    ///
    /// Any response still in flight will be reported as stale.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless the session is
    /// extracting or editing.
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, State::Extract | State::Edit(_)) {
            return Err(self.invalid(Action::Cancel));
        }
        self.generation += 1;
        self.pending = None;
        self.state = State::Cancelled;
        tracing::info!("session cancelled");
        Ok(())
    }

    /// Freeze the edited document and build the render request.
    ///
    /// An active drag is committed first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] outside the edit stage.
    pub fn request_apply(&mut self) -> Result<Ticket<RenderRequest>, SessionError> {
        let mut editing = match std::mem::replace(&mut self.state, State::Extract) {
            State::Edit(editing) => editing,
            other => {
                self.state = other;
                return Err(self.invalid(Action::RequestApply));
            }
        };
        editing.surface.end_drag();
        let frozen = editing.surface.graph().document().clone();
        let request = RenderRequest {
            pose_data: PoseData::from_document(&frozen),
            image_width: self.source.dimensions.width,
            image_height: self.source.dimensions.height,
            parameters: self.config.render.clone(),
        };
        self.state = State::Render { editing, frozen };
        let generation = self.issue();
        tracing::info!(%generation, "render requested");
        Ok(Ticket {
            generation,
            request,
        })
    }

    /// Accept the rasterization collaborator's answer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Render`] when the collaborator failed or
    /// returned no usable image. The session is back in the edit stage
    /// with the document exactly as it was before
    /// [`Self::request_apply`].
    pub fn complete_render<E: fmt::Display>(
        &mut self,
        generation: Generation,
        response: Result<RenderResponse, E>,
    ) -> Result<Delivery, SessionError> {
        if !self.accept(generation, Stage::Render) {
            return Ok(Delivery::Stale);
        }
        let (editing, frozen) = match std::mem::replace(&mut self.state, State::Extract) {
            State::Render { editing, frozen } => (editing, frozen),
            other => {
                self.state = other;
                return Ok(Delivery::Stale);
            }
        };

        match rendered_image(response) {
            Ok(rendered) => {
                tracing::info!(dimensions = %rendered.dimensions, "render succeeded");
                self.state = State::Apply {
                    editing,
                    frozen,
                    rendered,
                };
                Ok(Delivery::Accepted)
            }
            Err(message) => {
                let err = SessionError::Render(message);
                tracing::warn!(error = %err, "render failed; back to editing");
                self.state = State::Edit(editing);
                Err(err)
            }
        }
    }

    /// The rendered image awaiting placement.
    #[must_use]
    pub const fn rendered_image(&self) -> Option<&RenderedImage> {
        match &self.state {
            State::Apply { rendered, .. } => Some(rendered),
            _ => None,
        }
    }

    /// Place the rendered image into `scene`, select it, and finish.
    ///
    /// The node takes the source image's placement and is tagged with
    /// the pipeline name, a timestamp and the render parameters. The
    /// completion callback, if any, runs before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] outside the apply
    /// stage and [`SessionError::Apply`] if the scene rejects the node,
    /// in which case the session stays in the apply stage.
    pub fn apply<S: HostScene>(&mut self, scene: &mut S) -> Result<Completion, SessionError> {
        let State::Apply { rendered, .. } = &self.state else {
            return Err(self.invalid(Action::Apply));
        };
        let node = SceneNode {
            image: rendered.clone(),
            placement: self.source.placement,
            provenance: Provenance {
                pipeline: self.config.pipeline_name.clone(),
                timestamp_ms: now_ms(),
                parameters: self.config.render.clone(),
            },
        };

        let id = scene.add_node(node).map_err(|e| {
            let err = SessionError::Apply(e.to_string());
            tracing::warn!(error = %err, "host scene rejected rendered image");
            err
        })?;
        scene.set_selected(Some(id));

        let (editing, frozen, rendered) = match std::mem::replace(&mut self.state, State::Extract)
        {
            State::Apply {
                editing,
                frozen,
                rendered,
            } => (editing, frozen, rendered),
            other => {
                self.state = other;
                return Err(self.invalid(Action::Apply));
            }
        };
        let completion = Completion {
            original_document: editing.original.clone(),
            modified_document: frozen.clone(),
            rendered_image: rendered,
            node: id,
        };
        self.state = State::Done {
            original: editing.original,
            modified: frozen,
        };
        tracing::info!(node = %id, "rendered image placed");

        if let Some(callback) = self.on_complete.take() {
            callback(completion.clone());
        }
        Ok(completion)
    }

    fn issue(&mut self) -> Generation {
        self.generation += 1;
        self.pending = Some(self.generation);
        Generation(self.generation)
    }

    fn accept(&mut self, generation: Generation, stage: Stage) -> bool {
        if self.pending != Some(generation.0) || self.state.stage() != stage {
            tracing::debug!(
                %generation,
                pending = ?self.pending,
                stage = %self.state.stage(),
                "dropping stale response"
            );
            return false;
        }
        self.pending = None;
        true
    }

    fn expect_stage(&self, action: Action, stage: Stage) -> Result<(), SessionError> {
        if self.state.stage() == stage {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    const fn invalid(&self, action: Action) -> SessionError {
        SessionError::InvalidTransition {
            action,
            stage: self.state.stage(),
        }
    }
}

fn detect_document<E: fmt::Display>(
    response: Result<DetectResponse, E>,
) -> Result<PoseDocument, String> {
    let response = response.map_err(|e| format!("detector unreachable: {e}"))?;
    if !response.success {
        return Err(response
            .error
            .unwrap_or_else(|| "detector reported failure".to_owned()));
    }
    let data = response
        .pose_data
        .ok_or_else(|| "response has no pose data".to_owned())?;
    data.into_document().map_err(|e| e.to_string())
}

fn rendered_image<E: fmt::Display>(
    response: Result<RenderResponse, E>,
) -> Result<RenderedImage, String> {
    let response = response.map_err(|e| format!("renderer unreachable: {e}"))?;
    if response.success == Some(false) {
        return Err(response
            .error
            .unwrap_or_else(|| "renderer reported failure".to_owned()));
    }
    let encoded = response
        .skeleton_image
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| "response has no image".to_owned())?;
    let bytes = wire::decode_bitmap(&encoded).map_err(|e| e.to_string())?;
    let dimensions = wire::measure_bitmap(&bytes).map_err(|e| e.to_string())?;
    Ok(RenderedImage { bytes, dimensions })
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    use super::*;
    use crate::graph::tests::{SOURCE, body_only, full_person};
    use crate::types::{KeypointId, Person, Point, Side};

    pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn detected(person: Person) -> DetectResponse {
        DetectResponse {
            success: true,
            pose_data: Some(PoseData::from_document(&PoseDocument::new(vec![person]))),
            error: None,
        }
    }

    fn rendered() -> RenderResponse {
        RenderResponse {
            success: Some(true),
            skeleton_image: Some(wire::encode_bitmap(&png(SOURCE.width, SOURCE.height))),
            error: None,
        }
    }

    #[derive(Default)]
    struct Scene {
        nodes: Vec<SceneNode>,
        selected: Option<NodeId>,
        reject: bool,
    }

    impl HostScene for Scene {
        type Error = String;

        fn add_node(&mut self, node: SceneNode) -> Result<NodeId, String> {
            if self.reject {
                return Err("scene is locked".to_owned());
            }
            self.nodes.push(node);
            Ok(NodeId(self.nodes.len() as u64))
        }

        fn selected(&self) -> Option<NodeId> {
            self.selected
        }

        fn set_selected(&mut self, id: Option<NodeId>) {
            self.selected = id;
        }
    }

    fn session() -> Session {
        let source =
            SourceImage::with_dimensions(png(4, 4), SOURCE, Placement::default()).unwrap();
        Session::new(SessionConfig::default(), source).unwrap()
    }

    fn editing(person: Person) -> Session {
        let mut s = session();
        let ticket = s.begin_extract().unwrap();
        let delivery = s
            .complete_extract(ticket.generation, Ok::<_, String>(detected(person)))
            .unwrap();
        assert_eq!(delivery, Delivery::Accepted);
        s
    }

    #[test]
    fn source_image_measures_header() {
        let source = SourceImage::new(png(12, 5), Placement::default()).unwrap();
        assert_eq!(source.dimensions(), Dimensions::new(12, 5));
        assert!(matches!(
            SourceImage::new(b"garbage".to_vec(), Placement::default()),
            Err(SessionError::Configuration(_))
        ));
        assert!(matches!(
            SourceImage::with_dimensions(Vec::new(), Dimensions::new(0, 3), Placement::default()),
            Err(SessionError::Configuration(_))
        ));
    }

    #[test]
    fn bad_display_bound_is_rejected_up_front() {
        let mut config = SessionConfig::default();
        config.editor.max_display_side = 0.0;
        let source =
            SourceImage::with_dimensions(Vec::new(), SOURCE, Placement::default()).unwrap();
        assert!(matches!(
            Session::new(config, source),
            Err(SessionError::Configuration(_))
        ));
    }

    #[test]
    fn extract_request_carries_processor_and_image() {
        let mut s = session();
        let ticket = s.begin_extract().unwrap();
        assert_eq!(ticket.request.processor, "dwpose");
        assert_eq!(
            wire::decode_bitmap(&ticket.request.image).unwrap(),
            s.source().bytes()
        );
    }

    #[test]
    fn successful_extract_enters_edit() {
        let s = editing(body_only(0.9));
        assert_eq!(s.stage(), Stage::Edit);
        assert_eq!(s.surface().unwrap().graph().visible_edges().len(), 14);
        assert_eq!(s.original_document(), s.current_document());
    }

    #[test]
    fn extract_failures_abort_without_document() {
        let cases: Vec<Result<DetectResponse, String>> = vec![
            Err("connection refused".to_owned()),
            Ok(DetectResponse {
                success: false,
                pose_data: None,
                error: Some("model not loaded".to_owned()),
            }),
            Ok(DetectResponse {
                success: true,
                pose_data: None,
                error: None,
            }),
            Ok(DetectResponse {
                success: true,
                pose_data: Some(PoseData {
                    people: Some(Vec::new()),
                    canvas_width: None,
                    canvas_height: None,
                    version: None,
                }),
                error: None,
            }),
        ];
        for response in cases {
            let mut s = session();
            let ticket = s.begin_extract().unwrap();
            let err = s.complete_extract(ticket.generation, response).unwrap_err();
            assert!(matches!(err, SessionError::Detection(_)), "{err}");
            assert_eq!(s.stage(), Stage::Failed);
            assert!(s.current_document().is_none());
            assert_eq!(s.failure(), Some(&err));
        }
    }

    #[test]
    fn reissued_extract_makes_first_ticket_stale() {
        let mut s = session();
        let first = s.begin_extract().unwrap();
        let second = s.begin_extract().unwrap();
        assert_eq!(
            s.complete_extract(first.generation, Ok::<_, String>(detected(body_only(0.9))))
                .unwrap(),
            Delivery::Stale
        );
        assert_eq!(s.stage(), Stage::Extract);
        assert_eq!(
            s.complete_extract(second.generation, Ok::<_, String>(detected(body_only(0.9))))
                .unwrap(),
            Delivery::Accepted
        );
    }

    #[test]
    fn cancel_during_extract_makes_response_stale() {
        let mut s = session();
        let ticket = s.begin_extract().unwrap();
        s.cancel().unwrap();
        let delivery = s
            .complete_extract(ticket.generation, Ok::<_, String>(detected(body_only(0.9))))
            .unwrap();
        assert_eq!(delivery, Delivery::Stale);
        assert_eq!(s.stage(), Stage::Cancelled);
    }

    #[test]
    fn edit_surface_is_absent_outside_edit() {
        let mut s = session();
        assert!(s.surface_mut().is_none());
        let mut s = editing(body_only(0.9));
        s.request_apply().unwrap();
        assert!(s.surface_mut().is_none());
    }

    #[test]
    fn reset_restores_extracted_document() {
        let mut s = editing(body_only(0.9));
        let surface = s.surface_mut().unwrap();
        surface.start_drag(KeypointId::Body(0));
        surface.move_drag(Point::new(1.0, 1.0));
        surface.end_drag();
        assert_ne!(s.original_document(), s.current_document());
        s.reset().unwrap();
        assert_eq!(s.original_document(), s.current_document());
        assert_eq!(s.stage(), Stage::Edit);
    }

    #[test]
    fn wrong_stage_actions_are_invalid_transitions() {
        let mut s = session();
        assert_eq!(
            s.reset().unwrap_err(),
            SessionError::InvalidTransition {
                action: Action::Reset,
                stage: Stage::Extract
            }
        );
        assert!(matches!(
            s.request_apply(),
            Err(SessionError::InvalidTransition { .. })
        ));
        let mut scene = Scene::default();
        assert!(matches!(
            s.apply(&mut scene),
            Err(SessionError::InvalidTransition { .. })
        ));

        let mut s = editing(body_only(0.9));
        s.request_apply().unwrap();
        assert_eq!(
            s.cancel().unwrap_err(),
            SessionError::InvalidTransition {
                action: Action::Cancel,
                stage: Stage::Render
            }
        );
        assert!(s.begin_extract().is_err());
    }

    #[test]
    fn request_apply_commits_active_drag_and_freezes() {
        let mut s = editing(full_person(0.9));
        let surface = s.surface_mut().unwrap();
        surface.start_drag(KeypointId::Hand(Side::Left, 5));
        surface.move_drag(Point::new(10.0, 10.0));
        let edited = s.current_document().cloned().unwrap();

        let ticket = s.request_apply().unwrap();
        assert_eq!(s.stage(), Stage::Render);
        assert_eq!(ticket.request.image_width, SOURCE.width);
        assert_eq!(ticket.request.image_height, SOURCE.height);
        assert_eq!(ticket.request.pose_data.into_document().unwrap(), edited);
    }

    #[test]
    fn render_failure_returns_to_edit_unchanged() {
        let failures: Vec<Result<RenderResponse, String>> = vec![
            Err("timeout".to_owned()),
            Ok(RenderResponse {
                success: Some(false),
                skeleton_image: None,
                error: Some("boom".to_owned()),
            }),
            Ok(RenderResponse {
                success: None,
                skeleton_image: Some(String::new()),
                error: None,
            }),
            Ok(RenderResponse {
                success: Some(true),
                skeleton_image: Some(wire::encode_bitmap(b"not a png")),
                error: None,
            }),
        ];
        for response in failures {
            let mut s = editing(body_only(0.9));
            let surface = s.surface_mut().unwrap();
            surface.start_drag(KeypointId::Body(6));
            surface.move_drag(Point::new(33.0, 44.0));
            surface.end_drag();
            let before = s.current_document().cloned().unwrap();

            let ticket = s.request_apply().unwrap();
            let err = s.complete_render(ticket.generation, response).unwrap_err();
            assert!(matches!(err, SessionError::Render(_)), "{err}");
            assert_eq!(s.stage(), Stage::Edit);
            assert_eq!(s.current_document(), Some(&before));
        }
    }

    #[test]
    fn stale_render_response_is_dropped() {
        let mut s = editing(body_only(0.9));
        let ticket = s.request_apply().unwrap();
        let stale = Generation(ticket.generation.get() + 7);
        assert_eq!(
            s.complete_render(stale, Ok::<_, String>(rendered())).unwrap(),
            Delivery::Stale
        );
        assert_eq!(s.stage(), Stage::Render);
    }

    #[test]
    fn apply_places_selects_and_completes() {
        let seen = Rc::new(RefCell::new(None));
        let seen_clone = Rc::clone(&seen);
        let mut s = editing(full_person(0.9)).with_completion(move |c| {
            *seen_clone.borrow_mut() = Some(c);
        });
        let ticket = s.request_apply().unwrap();
        s.complete_render(ticket.generation, Ok::<_, String>(rendered()))
            .unwrap();
        assert_eq!(s.stage(), Stage::Apply);
        assert_eq!(s.rendered_image().unwrap().dimensions, SOURCE);

        let mut scene = Scene::default();
        let completion = s.apply(&mut scene).unwrap();
        assert_eq!(s.stage(), Stage::Done);
        assert_eq!(scene.selected(), Some(completion.node));
        assert_eq!(scene.nodes.len(), 1);
        let node = &scene.nodes[0];
        assert_eq!(node.provenance.pipeline, "pose_editor");
        assert_eq!(node.provenance.parameters, s.config().render);
        assert_eq!(node.placement, Placement::default());
        assert_eq!(seen.borrow().as_ref(), Some(&completion));
        assert_eq!(
            completion.modified_document.keypoint_count(),
            17 + 21 + 21
        );
    }

    #[test]
    fn apply_rejection_stays_in_apply_and_can_retry() {
        let mut s = editing(body_only(0.9));
        let ticket = s.request_apply().unwrap();
        s.complete_render(ticket.generation, Ok::<_, String>(rendered()))
            .unwrap();

        let mut scene = Scene {
            reject: true,
            ..Scene::default()
        };
        let err = s.apply(&mut scene).unwrap_err();
        assert_eq!(err, SessionError::Apply("scene is locked".to_owned()));
        assert_eq!(s.stage(), Stage::Apply);
        assert!(scene.selected().is_none());

        scene.reject = false;
        s.apply(&mut scene).unwrap();
        assert_eq!(s.stage(), Stage::Done);
    }
}
