//! Pointer translation and coordinate transformation
//!
//! [`PointerTranslator`] turns raw pointer samples into
//! [`NormalizedPointerEvent`]s in remote-desktop coordinates. It remembers
//! which button is logically held so that releases can be synthesized and
//! so that only one discrete button is ever down on the remote side.
//!
//! # Coordinate Transformation
//!
//! When the remote framebuffer is scaled and centered inside the view, device
//! coordinates must be mapped back into framebuffer space. The mapping keeps
//! the aspect ratio and clamps to `[0, width) x [0, height)`.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::modifier::ModifierMask;

/// Represents the transformation parameters for coordinate conversion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTransform {
    /// Scale factor applied to both X and Y (maintains aspect ratio)
    pub scale: f64,
    /// X offset for centering the framebuffer in the view
    pub offset_x: f64,
    /// Y offset for centering the framebuffer in the view
    pub offset_y: f64,
    /// Remote desktop width
    pub desktop_width: u32,
    /// Remote desktop height
    pub desktop_height: u32,
    /// View width
    pub view_width: u32,
    /// View height
    pub view_height: u32,
}

impl CoordinateTransform {
    /// Creates a new coordinate transform from view and desktop dimensions
    ///
    /// The transform maintains aspect ratio by using the minimum scale factor
    /// and centers the framebuffer within the view.
    ///
    /// # Example
    ///
    /// ```
    /// use tapdesk_core::input::CoordinateTransform;
    ///
    /// // View is 1920x1080, remote desktop is 1280x720
    /// let transform = CoordinateTransform::new(1920, 1080, 1280, 720);
    /// assert!((transform.scale - 1.5).abs() < 0.001);
    /// ```
    #[must_use]
    pub fn new(view_width: u32, view_height: u32, desktop_width: u32, desktop_height: u32) -> Self {
        if view_width == 0 || view_height == 0 || desktop_width == 0 || desktop_height == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0.0,
                offset_y: 0.0,
                desktop_width: desktop_width.max(1),
                desktop_height: desktop_height.max(1),
                view_width: view_width.max(1),
                view_height: view_height.max(1),
            };
        }

        let view_w = f64::from(view_width);
        let view_h = f64::from(view_height);
        let desktop_w = f64::from(desktop_width);
        let desktop_h = f64::from(desktop_height);

        let scale = (view_w / desktop_w).min(view_h / desktop_h);
        let offset_x = desktop_w.mul_add(-scale, view_w) / 2.0;
        let offset_y = desktop_h.mul_add(-scale, view_h) / 2.0;

        Self {
            scale,
            offset_x,
            offset_y,
            desktop_width,
            desktop_height,
            view_width,
            view_height,
        }
    }

    /// Creates a transform where device coordinates already are desktop
    /// coordinates
    #[must_use]
    pub fn identity(desktop_width: u32, desktop_height: u32) -> Self {
        Self::new(desktop_width, desktop_height, desktop_width, desktop_height)
    }

    /// Transforms view coordinates to desktop coordinates with clamping
    ///
    /// Out-of-range coordinates are clamped to `0` and `width - 1` /
    /// `height - 1` rather than rejected.
    ///
    /// ```
    /// use tapdesk_core::input::CoordinateTransform;
    ///
    /// let transform = CoordinateTransform::new(1920, 1080, 1280, 720);
    /// let (x, y) = transform.transform_clamped(-100.0, -100.0);
    /// assert_eq!(x, 0.0);
    /// assert_eq!(y, 0.0);
    /// ```
    #[must_use]
    pub fn transform_clamped(&self, view_x: f64, view_y: f64) -> (f64, f64) {
        let x = (view_x - self.offset_x) / self.scale;
        let y = (view_y - self.offset_y) / self.scale;

        let max_x = (f64::from(self.desktop_width) - 1.0).max(0.0);
        let max_y = (f64::from(self.desktop_height) - 1.0).max(0.0);

        (x.clamp(0.0, max_x), y.clamp(0.0, max_y))
    }

    /// Transforms view coordinates to integer desktop coordinates
    #[must_use]
    pub fn transform_to_u16(&self, view_x: f64, view_y: f64) -> (u16, u16) {
        let (x, y) = self.transform_clamped(view_x, view_y);

        // Clamped values are non-negative; u16 caps the wire range
        let x = (x.round() as u32).min(u32::from(u16::MAX)) as u16;
        let y = (y.round() as u32).min(u32::from(u16::MAX)) as u16;
        (x, y)
    }
}

/// The discrete button a pointer event concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerButton {
    /// Motion only
    Move,
    /// Primary button
    Left,
    /// Middle button
    Middle,
    /// Secondary button
    Right,
    /// One wheel click up
    ScrollUp,
    /// One wheel click down
    ScrollDown,
    /// One wheel click left
    ScrollLeft,
    /// One wheel click right
    ScrollRight,
}

impl PointerButton {
    /// RFB button-mask bit for this button (0 for motion)
    #[must_use]
    pub const fn mask(self) -> u8 {
        match self {
            Self::Move => 0,
            Self::Left => 1 << 0,
            Self::Middle => 1 << 1,
            Self::Right => 1 << 2,
            Self::ScrollUp => 1 << 3,
            Self::ScrollDown => 1 << 4,
            Self::ScrollLeft => 1 << 5,
            Self::ScrollRight => 1 << 6,
        }
    }

    /// Returns true for wheel buttons
    #[must_use]
    pub const fn is_scroll(self) -> bool {
        matches!(
            self,
            Self::ScrollUp | Self::ScrollDown | Self::ScrollLeft | Self::ScrollRight
        )
    }
}

/// Scroll direction of a discrete wheel click
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrollDirection {
    /// Scroll up
    Up,
    /// Scroll down
    Down,
    /// Scroll left
    Left,
    /// Scroll right
    Right,
}

impl ScrollDirection {
    /// The wheel button for this direction
    #[must_use]
    pub const fn button(self) -> PointerButton {
        match self {
            Self::Up => PointerButton::ScrollUp,
            Self::Down => PointerButton::ScrollDown,
            Self::Left => PointerButton::ScrollLeft,
            Self::Right => PointerButton::ScrollRight,
        }
    }
}

/// A pointer event in remote-desktop coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedPointerEvent {
    /// X coordinate, within `[0, desktop_width)`
    pub x: u16,
    /// Y coordinate, within `[0, desktop_height)`
    pub y: u16,
    /// The button this event presses or releases, or `Move`
    pub button: PointerButton,
    /// Whether `button` goes down
    pub down: bool,
    /// RFB-style mask of buttons held after this event
    pub buttons: u8,
    /// Modifiers in effect for this event
    pub meta: ModifierMask,
}

/// Converts speed of a scroll gesture into discrete wheel clicks
///
/// The constants are tuning policy and come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollPolicy {
    /// Accumulated gesture distance per wheel click
    pub distance_per_click: f64,
    /// Upper bound on clicks per gesture sample
    pub max_repeat: u32,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            distance_per_click: 20.0,
            max_repeat: 10,
        }
    }
}

impl ScrollPolicy {
    /// Number of wheel clicks for an accumulated gesture distance
    ///
    /// Always at least one click, at most `max_repeat`.
    #[must_use]
    pub fn repeat_count(&self, accumulated_distance: f64) -> u32 {
        if !accumulated_distance.is_finite() || self.distance_per_click <= 0.0 {
            return 1;
        }
        let clicks = (accumulated_distance.abs() / self.distance_per_click).floor();
        let max = self.max_repeat.max(1);
        if clicks >= f64::from(max) {
            max
        } else {
            (clicks as u32).max(1)
        }
    }
}

/// Tracks pointer button state and produces normalized pointer events
#[derive(Debug, Clone)]
pub struct PointerTranslator {
    transform: CoordinateTransform,
    prev_pointer_mask: Option<PointerButton>,
    x: u16,
    y: u16,
}

impl PointerTranslator {
    /// Creates a translator for a desktop of the given size, with device
    /// coordinates equal to desktop coordinates
    #[must_use]
    pub fn new(desktop_width: u32, desktop_height: u32) -> Self {
        Self {
            transform: CoordinateTransform::identity(desktop_width, desktop_height),
            prev_pointer_mask: None,
            x: 0,
            y: 0,
        }
    }

    /// Sets the view size the remote framebuffer is displayed in
    pub fn set_view_size(&mut self, view_width: u32, view_height: u32) {
        self.transform = CoordinateTransform::new(
            view_width,
            view_height,
            self.transform.desktop_width,
            self.transform.desktop_height,
        );
    }

    /// Updates the desktop size after a remote resolution change
    pub fn resize_desktop(&mut self, desktop_width: u32, desktop_height: u32) {
        let (view_width, view_height) = if self.is_identity() {
            (desktop_width, desktop_height)
        } else {
            (self.transform.view_width, self.transform.view_height)
        };
        self.transform =
            CoordinateTransform::new(view_width, view_height, desktop_width, desktop_height);
        // Keep the last position inside the new bounds
        let max_x = desktop_width.saturating_sub(1).min(u32::from(u16::MAX)) as u16;
        let max_y = desktop_height.saturating_sub(1).min(u32::from(u16::MAX)) as u16;
        self.x = self.x.min(max_x);
        self.y = self.y.min(max_y);
    }

    fn is_identity(&self) -> bool {
        self.transform.view_width == self.transform.desktop_width
            && self.transform.view_height == self.transform.desktop_height
    }

    /// Returns the active coordinate transform
    #[must_use]
    pub const fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Returns the last transmitted position
    #[must_use]
    pub const fn position(&self) -> (u16, u16) {
        (self.x, self.y)
    }

    /// Returns the button currently held, if any
    #[must_use]
    pub const fn held_button(&self) -> Option<PointerButton> {
        self.prev_pointer_mask
    }

    fn held_mask(&self) -> u8 {
        self.prev_pointer_mask.map_or(0, PointerButton::mask)
    }

    fn locate(&mut self, x: f64, y: f64) -> (u16, u16) {
        let (x, y) = self.transform.transform_to_u16(x, y);
        self.x = x;
        self.y = y;
        (x, y)
    }

    /// Presses `button`
    ///
    /// If a different button is still held, a release of that button is
    /// synthesized first so the remote side never sees two buttons down.
    pub fn down(
        &mut self,
        button: PointerButton,
        x: f64,
        y: f64,
        meta: ModifierMask,
    ) -> Vec<NormalizedPointerEvent> {
        let (x, y) = self.locate(x, y);
        let mut events = Vec::with_capacity(2);

        if let Some(prev) = self.prev_pointer_mask {
            if prev != button {
                trace!("Releasing {prev:?} before pressing {button:?}");
                events.push(NormalizedPointerEvent {
                    x,
                    y,
                    button: prev,
                    down: false,
                    buttons: 0,
                    meta,
                });
            }
        }

        events.push(NormalizedPointerEvent {
            x,
            y,
            button,
            down: true,
            buttons: button.mask(),
            meta,
        });
        self.prev_pointer_mask = Some(button);
        events
    }

    /// Moves the pointer, dragging the held button if any
    pub fn move_to(&mut self, x: f64, y: f64, meta: ModifierMask) -> NormalizedPointerEvent {
        let (x, y) = self.locate(x, y);
        NormalizedPointerEvent {
            x,
            y,
            button: PointerButton::Move,
            down: false,
            buttons: self.held_mask(),
            meta,
        }
    }

    /// Releases the held button
    ///
    /// With no button held the result is a plain move to the position.
    pub fn release(&mut self, x: f64, y: f64, meta: ModifierMask) -> NormalizedPointerEvent {
        let (x, y) = self.locate(x, y);
        let button = self.prev_pointer_mask.take().unwrap_or(PointerButton::Move);
        NormalizedPointerEvent {
            x,
            y,
            button,
            down: false,
            buttons: 0,
            meta,
        }
    }

    /// Emits `repeat` discrete wheel clicks (press and release each)
    pub fn scroll(
        &mut self,
        direction: ScrollDirection,
        x: f64,
        y: f64,
        meta: ModifierMask,
        repeat: u32,
    ) -> Vec<NormalizedPointerEvent> {
        let (x, y) = self.locate(x, y);
        let button = direction.button();
        let held = self.held_mask();
        let clicks = repeat.max(1);

        (0..clicks)
            .flat_map(|_| {
                [
                    NormalizedPointerEvent {
                        x,
                        y,
                        button,
                        down: true,
                        buttons: held | button.mask(),
                        meta,
                    },
                    NormalizedPointerEvent {
                        x,
                        y,
                        button,
                        down: false,
                        buttons: held,
                        meta,
                    },
                ]
            })
            .collect()
    }
}
