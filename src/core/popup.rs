use crate::core::surface::Surface;

/// Shows a modal element and marks it visible to assistive tech.
pub fn open(surface: &mut Surface, id: &str) {
    surface.show(id);
    surface.set_attr(id, "aria-hidden", "false");
}

pub fn close(surface: &mut Surface, id: &str) {
    surface.hide(id);
    surface.set_attr(id, "aria-hidden", "true");
}

pub fn is_open(surface: &Surface, id: &str) -> bool {
    !surface.is_hidden(id)
}

/// Dropdown anchored to a trigger button that carries `aria-expanded`.
pub struct Dropdown {
    pub menu: &'static str,
    pub trigger: &'static str,
}

impl Dropdown {
    pub fn open(&self, surface: &mut Surface) {
        surface.show(self.menu);
        surface.set_attr(self.trigger, "aria-expanded", "true");
    }

    pub fn close(&self, surface: &mut Surface) {
        surface.hide(self.menu);
        surface.set_attr(self.trigger, "aria-expanded", "false");
    }

    pub fn toggle(&self, surface: &mut Surface) {
        if surface.is_hidden(self.menu) {
            self.open(surface);
        } else {
            self.close(surface);
        }
    }
}
